use std::time::Duration;

use eframe::egui::{
    self, Align2, Color32, CursorIcon, FontId, Painter, PointerButton, Pos2, Rect, Sense, Shape,
    Stroke, Ui, Vec2,
};

use super::TopologyApp;
use super::render_utils::{
    arrow_head, blend_color, circle_visible, draw_background, edge_visible, quadratic_points,
};
use crate::engine::{Emphasis, FlowSprite, LinkSprite, NodeSprite, Scene, ViewTransform};

const FLOW_SEGMENTS: usize = 16;
const LABEL_FONT_SIZE: f32 = 12.0;
const MIN_TEXT_SIZE: f32 = 5.0;
const HOVER_LIGHTEN: f32 = 0.25;
const HALO_GAP: f32 = 4.0;

impl TopologyApp {
    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui, dt: Duration) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let local = |screen: Pos2| (screen - rect.min).to_pos2();
        let engine = self.controller.engine_mut();
        engine.resize(rect.size());

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                let pointer = ui
                    .input(|input| input.pointer.hover_pos())
                    .unwrap_or_else(|| rect.center());
                let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
                engine.zoom_at(local(pointer), factor);
            }
        }

        if response.drag_started_by(PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
            && let Some(id) = engine.node_at(local(pointer)).map(str::to_owned)
        {
            engine.drag_start(&id);
        }
        if response.dragged() {
            match response.interact_pointer_pos() {
                Some(pointer) if engine.is_dragging() => engine.drag_to(local(pointer)),
                _ => engine.pan_by(response.drag_delta()),
            }
        }
        if response.drag_stopped() {
            engine.drag_end();
        }

        if response.clicked_by(PointerButton::Primary) {
            let hit = response
                .interact_pointer_pos()
                .and_then(|pointer| engine.node_at(local(pointer)))
                .map(str::to_owned);
            match hit {
                Some(id) => engine.click_node(&id),
                None => engine.click_background(),
            }
        }

        if engine.tick(dt) || response.dragged() {
            ui.ctx().request_repaint();
        }

        let hovered = response
            .hover_pos()
            .and_then(|pointer| engine.node_at(local(pointer)))
            .map(str::to_owned);
        if hovered.is_some() {
            ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
        }

        let scene = engine.scene();
        paint_scene(&ui.painter_at(rect), rect, &scene, hovered.as_deref());
    }
}

struct ScreenMapping {
    rect: Rect,
    transform: ViewTransform,
}

impl ScreenMapping {
    fn point(&self, world: Vec2) -> Pos2 {
        self.rect.min + self.transform.world_to_screen(world).to_vec2()
    }

    fn length(&self, world: f32) -> f32 {
        world * self.transform.scale
    }
}

fn paint_scene(painter: &Painter, rect: Rect, scene: &Scene, hovered: Option<&str>) {
    draw_background(
        painter,
        rect,
        scene.transform,
        scene.palette.background,
        scene.palette.theme,
    );

    let mapping = ScreenMapping {
        rect,
        transform: scene.transform,
    };

    for link in &scene.links {
        paint_link(painter, &mapping, link);
    }
    for node in &scene.nodes {
        let hovered = hovered == Some(node.id.as_str());
        paint_node(painter, &mapping, node, scene.palette.label, hovered);
    }

    if let Some(node) = hovered.and_then(|id| scene.node(id)) {
        painter.text(
            rect.left_top() + egui::vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            format!("{}  {}", node.glyph, node.label),
            FontId::proportional(13.0),
            scene.palette.label,
        );
    }
}

fn paint_link(painter: &Painter, mapping: &ScreenMapping, link: &LinkSprite) {
    let from = mapping.point(link.from);
    let to = mapping.point(link.to);
    let width = mapping.length(link.width);
    if !edge_visible(mapping.rect, from, to, width + mapping.length(40.0)) {
        return;
    }

    painter.line_segment(
        [from, to],
        Stroke::new(width, link.color.gamma_multiply(link.opacity)),
    );
    if let Some(flow) = &link.flow {
        paint_flow(painter, mapping, flow);
    }
}

fn paint_flow(painter: &Painter, mapping: &ScreenMapping, flow: &FlowSprite) {
    let start = mapping.point(flow.start);
    let control = mapping.point(flow.control);
    let end = mapping.point(flow.end);
    let color = flow.color.gamma_multiply(flow.opacity);

    painter.add(Shape::line(
        quadratic_points(start, control, end, FLOW_SEGMENTS),
        Stroke::new(mapping.length(flow.width), color),
    ));
    if let Some(triangle) = arrow_head(end, end - control, mapping.transform.scale) {
        painter.add(Shape::convex_polygon(
            triangle.to_vec(),
            flow.color,
            Stroke::NONE,
        ));
    }
}

fn paint_node(
    painter: &Painter,
    mapping: &ScreenMapping,
    node: &NodeSprite,
    label_color: Color32,
    hovered: bool,
) {
    let center = mapping.point(node.center);
    let radius = mapping.length(node.radius);
    let label_offset = mapping.length(node.label_offset);
    if !circle_visible(mapping.rect, center, radius + label_offset) {
        return;
    }

    let fill = if hovered {
        blend_color(node.fill, Color32::WHITE, HOVER_LIGHTEN)
    } else {
        node.fill
    };
    if node.emphasis == Emphasis::Selected {
        painter.circle_stroke(
            center,
            radius + mapping.length(HALO_GAP + node.stroke_width),
            Stroke::new(mapping.length(1.5), node.stroke.gamma_multiply(0.45)),
        );
    }
    painter.circle_filled(center, radius, fill);
    painter.circle_stroke(
        center,
        radius,
        Stroke::new(mapping.length(node.stroke_width), node.stroke),
    );

    if radius >= MIN_TEXT_SIZE {
        painter.text(
            center,
            Align2::CENTER_CENTER,
            node.glyph,
            FontId::proportional(radius),
            Color32::WHITE,
        );
    }

    let label_size = mapping.length(LABEL_FONT_SIZE);
    if label_size >= MIN_TEXT_SIZE {
        painter.text(
            center + egui::vec2(0.0, label_offset),
            Align2::CENTER_TOP,
            &node.label,
            FontId::proportional(label_size),
            label_color,
        );
    }

    let dot = &node.status;
    let dot_center = center + dot.offset * mapping.transform.scale;
    painter.circle(
        dot_center,
        mapping.length(dot.radius),
        dot.fill,
        Stroke::new(mapping.length(1.0), dot.outline),
    );
}
