pub fn display_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => fallback,
    }
}

pub fn format_millis(millis: f64) -> String {
    if millis >= 100.0 {
        format!("{millis:.0} ms")
    } else {
        format!("{millis:.1} ms")
    }
}
