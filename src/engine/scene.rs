use eframe::egui::{Color32, Vec2, vec2};

use super::GraphEngine;
use super::style::{
    NEIGHBOR_STROKE, Palette, SELECTED_STROKE, darker, link_width, node_glyph,
};
use super::view::ViewTransform;
use crate::topology::DataFlow;

const NORMAL_STROKE_WIDTH: f32 = 2.0;
const SELECTED_STROKE_WIDTH: f32 = 3.0;
const NEIGHBOR_STROKE_WIDTH: f32 = 2.0;
const LINK_OPACITY: f32 = 0.7;
const FLOW_OPACITY: f32 = 0.5;
const FLOW_WIDTH_FACTOR: f32 = 0.8;
const STATUS_DOT_RADIUS: f32 = 4.0;
const LABEL_OFFSET_FACTOR: f32 = 1.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emphasis {
    Normal,
    Selected,
    Neighbor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusDot {
    pub offset: Vec2,
    pub radius: f32,
    pub fill: Color32,
    pub outline: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSprite {
    pub id: String,
    pub center: Vec2,
    pub radius: f32,
    pub fill: Color32,
    pub stroke: Color32,
    pub stroke_width: f32,
    pub glyph: &'static str,
    pub label: String,
    pub label_offset: f32,
    pub status: StatusDot,
    pub emphasis: Emphasis,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowSprite {
    pub start: Vec2,
    pub control: Vec2,
    pub end: Vec2,
    pub width: f32,
    pub opacity: f32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkSprite {
    pub from: Vec2,
    pub to: Vec2,
    pub width: f32,
    pub color: Color32,
    pub opacity: f32,
    pub highlighted: bool,
    pub flow: Option<FlowSprite>,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub transform: ViewTransform,
    pub palette: Palette,
    pub links: Vec<LinkSprite>,
    pub nodes: Vec<NodeSprite>,
}

impl Scene {
    pub fn node(&self, id: &str) -> Option<&NodeSprite> {
        self.nodes.iter().find(|sprite| sprite.id == id)
    }
}

impl GraphEngine {
    pub fn scene(&self) -> Scene {
        let palette = Palette::resolve(self.theme);
        let config = &self.config;
        let radius = config.node_radius;

        let links = self
            .links
            .iter()
            .map(|link| {
                let from = self.bodies[link.source].position;
                let to = self.bodies[link.target].position;
                let color = palette.link_color(link.record.status);
                let base_width = link_width(link.record.bandwidth, config);
                let highlighted = self
                    .selection
                    .as_ref()
                    .is_some_and(|selection| link.touches(selection.index));

                let flow = match link.record.data_flow {
                    DataFlow::None => None,
                    DataFlow::Outgoing => Some((from, to)),
                    DataFlow::Incoming => Some((to, from)),
                }
                .map(|(start, end)| FlowSprite {
                    start,
                    control: (start + end) * 0.5 + vec2(config.flow_curve_offset, 0.0),
                    end,
                    width: base_width * FLOW_WIDTH_FACTOR,
                    opacity: FLOW_OPACITY,
                    color,
                });

                LinkSprite {
                    from,
                    to,
                    width: if highlighted { base_width + 1.0 } else { base_width },
                    color,
                    opacity: if highlighted { 1.0 } else { LINK_OPACITY },
                    highlighted,
                    flow,
                }
            })
            .collect();

        let nodes = self
            .records
            .iter()
            .zip(&self.bodies)
            .enumerate()
            .map(|(index, (record, body))| {
                let fill = palette.node_fill(record.node_type);
                let emphasis = self.emphasis_of(index);
                let (stroke, stroke_width) = match emphasis {
                    Emphasis::Selected => (SELECTED_STROKE, SELECTED_STROKE_WIDTH),
                    Emphasis::Neighbor => (NEIGHBOR_STROKE, NEIGHBOR_STROKE_WIDTH),
                    Emphasis::Normal => (darker(fill, 0.5), NORMAL_STROKE_WIDTH),
                };

                NodeSprite {
                    id: record.id.clone(),
                    center: body.position,
                    radius,
                    fill,
                    stroke,
                    stroke_width,
                    glyph: node_glyph(record.node_type),
                    label: record.display_name().to_owned(),
                    label_offset: radius * LABEL_OFFSET_FACTOR,
                    status: StatusDot {
                        offset: vec2(radius * 0.8, -radius * 0.8),
                        radius: STATUS_DOT_RADIUS,
                        fill: palette.status_dot(record.status),
                        outline: palette.status_outline,
                    },
                    emphasis,
                }
            })
            .collect();

        Scene {
            transform: self.viewport.transform(),
            palette,
            links,
            nodes,
        }
    }

    fn emphasis_of(&self, index: usize) -> Emphasis {
        match &self.selection {
            Some(selection) if selection.index == index => Emphasis::Selected,
            Some(selection) if selection.neighbors.contains(&index) => Emphasis::Neighbor,
            _ => Emphasis::Normal,
        }
    }
}
