use eframe::egui::Color32;

use crate::config::EngineConfig;
use crate::topology::{LinkStatus, NodeStatus, NodeType};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }
}

#[derive(Clone, Copy)]
struct Shade {
    light: Color32,
    dark: Color32,
}

impl Shade {
    const fn new(light: Color32, dark: Color32) -> Self {
        Self { light, dark }
    }

    fn pick(self, theme: Theme) -> Color32 {
        match theme {
            Theme::Light => self.light,
            Theme::Dark => self.dark,
        }
    }
}

const ROUTER: Shade = Shade::new(
    Color32::from_rgb(0x42, 0x85, 0xF4),
    Color32::from_rgb(0x5C, 0x9A, 0xFF),
);
const SWITCH: Shade = Shade::new(
    Color32::from_rgb(0x34, 0xA8, 0x53),
    Color32::from_rgb(0x4D, 0xC9, 0x75),
);
const ACCESS_POINT: Shade = Shade::new(
    Color32::from_rgb(0xFB, 0xBC, 0x05),
    Color32::from_rgb(0xFF, 0xCE, 0x35),
);
const SERVER: Shade = Shade::new(
    Color32::from_rgb(0xEA, 0x43, 0x35),
    Color32::from_rgb(0xFF, 0x6B, 0x60),
);
const DEVICE: Shade = Shade::new(
    Color32::from_rgb(0x9E, 0x9E, 0x9E),
    Color32::from_rgb(0xBD, 0xBD, 0xBD),
);
const INTERNET: Shade = Shade::new(
    Color32::from_rgb(0x67, 0x3A, 0xB7),
    Color32::from_rgb(0x89, 0x59, 0xF6),
);
const LINK_ACTIVE: Shade = Shade::new(
    Color32::from_rgb(0x42, 0x85, 0xF4),
    Color32::from_rgb(0x5C, 0x9A, 0xFF),
);
const LINK_INACTIVE: Shade = Shade::new(
    Color32::from_rgb(0xCC, 0xCC, 0xCC),
    Color32::from_rgb(0x55, 0x55, 0x55),
);

pub const SELECTED_STROKE: Color32 = Color32::from_rgb(0xFF, 0x57, 0x22);
pub const NEIGHBOR_STROKE: Color32 = Color32::from_rgb(0xFF, 0x98, 0x00);
const ONLINE: Color32 = Color32::from_rgb(0x34, 0xA8, 0x53);
const OFFLINE: Color32 = Color32::from_rgb(0xEA, 0x43, 0x35);

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub theme: Theme,
    pub label: Color32,
    pub status_outline: Color32,
    pub background: Color32,
    link_active: Color32,
    link_inactive: Color32,
}

impl Palette {
    pub fn resolve(theme: Theme) -> Self {
        let (label, status_outline, background) = match theme {
            Theme::Light => (
                Color32::from_rgb(0x33, 0x33, 0x33),
                Color32::WHITE,
                Color32::from_rgb(0xF7, 0xF8, 0xFA),
            ),
            Theme::Dark => (
                Color32::from_rgb(0xEE, 0xEE, 0xEE),
                Color32::from_rgb(0x33, 0x33, 0x33),
                Color32::from_rgb(19, 23, 29),
            ),
        };

        Self {
            theme,
            label,
            status_outline,
            background,
            link_active: LINK_ACTIVE.pick(theme),
            link_inactive: LINK_INACTIVE.pick(theme),
        }
    }

    pub fn node_fill(&self, node_type: NodeType) -> Color32 {
        let shade = match node_type {
            NodeType::Router => ROUTER,
            NodeType::Switch => SWITCH,
            NodeType::AccessPoint => ACCESS_POINT,
            NodeType::Server => SERVER,
            NodeType::Device => DEVICE,
            NodeType::Internet => INTERNET,
        };
        shade.pick(self.theme)
    }

    pub fn link_color(&self, status: LinkStatus) -> Color32 {
        match status {
            LinkStatus::Active => self.link_active,
            LinkStatus::Inactive => self.link_inactive,
        }
    }

    pub fn status_dot(&self, status: NodeStatus) -> Color32 {
        if status.is_online() { ONLINE } else { OFFLINE }
    }
}

pub fn node_glyph(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Router | NodeType::Switch => "🖧",
        NodeType::AccessPoint => "📶",
        NodeType::Server => "🖥",
        NodeType::Device => "📱",
        NodeType::Internet => "🌐",
    }
}

pub fn darker(color: Color32, k: f32) -> Color32 {
    let factor = 0.7_f32.powf(k);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor).round() as u8,
        (color.g() as f32 * factor).round() as u8,
        (color.b() as f32 * factor).round() as u8,
        color.a(),
    )
}

pub fn link_width(bandwidth: Option<f64>, config: &EngineConfig) -> f32 {
    let bandwidth = bandwidth
        .filter(|value| value.is_finite())
        .unwrap_or(config.default_bandwidth)
        .max(0.0);
    let ratio = if config.max_bandwidth > 0.0 {
        (bandwidth / config.max_bandwidth).min(1.0)
    } else {
        1.0
    };
    config.min_link_width + (ratio as f32 * config.max_link_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_width_scales_with_bandwidth_up_to_the_maximum() {
        let config = EngineConfig::default();
        assert_eq!(link_width(Some(500.0), &config), 5.0);
        assert_eq!(link_width(None, &config), 1.0 + 0.1 * 8.0);
        assert_eq!(link_width(Some(1000.0), &config), 9.0);
        assert_eq!(link_width(Some(2000.0), &config), 9.0);
        assert_eq!(link_width(Some(f64::INFINITY), &config), 1.0 + 0.1 * 8.0);
        assert_eq!(link_width(Some(-5.0), &config), 1.0);
    }

    #[test]
    fn palette_follows_theme() {
        let light = Palette::resolve(Theme::Light);
        let dark = Palette::resolve(Theme::Dark);
        assert_eq!(light.node_fill(NodeType::Router), Color32::from_rgb(0x42, 0x85, 0xF4));
        assert_eq!(dark.node_fill(NodeType::Router), Color32::from_rgb(0x5C, 0x9A, 0xFF));
        assert_eq!(dark.link_color(LinkStatus::Inactive), Color32::from_rgb(0x55, 0x55, 0x55));
        assert_eq!(light.status_dot(NodeStatus::Online), ONLINE);
        assert_eq!(light.status_dot(NodeStatus::Offline), OFFLINE);
    }

    #[test]
    fn darker_scales_channels() {
        let color = darker(Color32::from_rgb(200, 100, 0), 1.0);
        assert_eq!(color, Color32::from_rgb(140, 70, 0));
    }
}
