use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::engine::{Theme, ViewTransform};

const GRID_STEP: f32 = 56.0;
const ARROW_LENGTH: f32 = 10.0;
const ARROW_HALF_WIDTH: f32 = 4.0;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn draw_background(
    painter: &Painter,
    rect: Rect,
    transform: ViewTransform,
    background: Color32,
    theme: Theme,
) {
    painter.rect_filled(rect, 0.0, background);

    let grid = match theme {
        Theme::Light => Color32::from_rgba_unmultiplied(0, 0, 0, 18),
        Theme::Dark => Color32::from_rgba_unmultiplied(60, 70, 80, 70),
    };
    let stroke = Stroke::new(1.0, grid);
    let step = (GRID_STEP * transform.scale).max(20.0);
    let origin = rect.min + transform.translation;

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.expand(padding).contains(start) || rect.expand(padding).contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

pub(super) fn quadratic_points(start: Pos2, control: Pos2, end: Pos2, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|step| {
            let t = step as f32 / segments as f32;
            let inverse = 1.0 - t;
            let point = start.to_vec2() * (inverse * inverse)
                + control.to_vec2() * (2.0 * inverse * t)
                + end.to_vec2() * (t * t);
            point.to_pos2()
        })
        .collect()
}

pub(super) fn arrow_head(tip: Pos2, direction: Vec2, scale: f32) -> Option<[Pos2; 3]> {
    let direction = direction.normalized();
    if !direction.is_finite() || direction == Vec2::ZERO {
        return None;
    }
    let normal = direction.rot90();
    let base = tip - direction * ARROW_LENGTH * scale;
    Some([
        tip,
        base + normal * ARROW_HALF_WIDTH * scale,
        base - normal * ARROW_HALF_WIDTH * scale,
    ])
}
