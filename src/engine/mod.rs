mod bind;
mod events;
mod scene;
mod simulation;
mod style;
mod view;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use eframe::egui::{Pos2, Vec2};
use log::{debug, info};

use crate::config::EngineConfig;
use crate::topology::{LinkRecord, NodeRecord, SIMULATION_KEYS, TopologySnapshot};
use bind::{BoundLink, bind, neighbors_of};
use events::Observers;
use simulation::{Body, Simulation};

pub use events::SelectionEvent;
pub use scene::{Emphasis, FlowSprite, LinkSprite, NodeSprite, Scene};
pub use style::{NEIGHBOR_STROKE, SELECTED_STROKE, Theme};
pub use view::ViewTransform;
use view::Viewport;

const MAX_STEPS_PER_FRAME: usize = 4;
const LINK_INTERNAL_KEYS: [&str; 3] = ["index", "sourceNode", "targetNode"];

struct Selection {
    index: usize,
    neighbors: HashSet<usize>,
}

pub struct GraphEngine {
    config: EngineConfig,
    theme: Theme,
    records: Vec<NodeRecord>,
    bodies: Vec<Body>,
    index_by_id: HashMap<String, usize>,
    links: Vec<BoundLink>,
    simulation: Simulation,
    viewport: Viewport,
    selection: Option<Selection>,
    dragging: Option<usize>,
    observers: Observers,
}

impl GraphEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            theme: config.theme,
            simulation: Simulation::new(&config),
            viewport: Viewport::new(&config),
            records: Vec::new(),
            bodies: Vec::new(),
            index_by_id: HashMap::new(),
            links: Vec::new(),
            selection: None,
            dragging: None,
            observers: Observers::default(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_data(&mut self, nodes: &[NodeRecord], links: &[LinkRecord]) {
        let previous = self
            .records
            .iter()
            .zip(&self.bodies)
            .map(|(record, body)| (record.id.clone(), body.position))
            .collect::<HashMap<_, _>>();
        let selected_id = self
            .selection
            .take()
            .map(|selection| self.records[selection.index].clone());

        let binding = bind(nodes, links, &previous, self.viewport.size() * 0.5);
        self.records = binding.records;
        self.bodies = binding.bodies;
        self.index_by_id = binding.index_by_id;
        self.links = binding.links;
        self.dragging = None;

        self.simulation.set_links(
            self.bodies.len(),
            self.links.iter().map(|link| (link.source, link.target)),
        );
        debug!("{} spring(s) in simulation", self.simulation.spring_count());

        if let Some(previous) = selected_id {
            match self.index_by_id.get(&previous.id).copied() {
                Some(index) => {
                    self.selection = Some(Selection {
                        index,
                        neighbors: neighbors_of(&self.links, index),
                    });
                }
                None => self
                    .observers
                    .emit(&SelectionEvent::Deselected(previous)),
            }
        }

        info!(
            "graph bound: {} node(s), {} link(s)",
            self.records.len(),
            self.links.len()
        );
        self.reheat();
    }

    pub fn data(&self) -> TopologySnapshot {
        let nodes = self
            .records
            .iter()
            .zip(&self.bodies)
            .map(|(record, body)| {
                let mut node = record.clone();
                node.x = Some(body.position.x);
                node.y = Some(body.position.y);
                for key in SIMULATION_KEYS {
                    node.extra.remove(key);
                }
                node
            })
            .collect();

        let links = self
            .links
            .iter()
            .map(|link| {
                let mut record = link.record.clone();
                record.source = self.records[link.source].id.clone();
                record.target = self.records[link.target].id.clone();
                for key in LINK_INTERNAL_KEYS {
                    record.extra.remove(key);
                }
                record
            })
            .collect();

        TopologySnapshot { nodes, links }
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.records
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.index_by_id.get(id).map(|&index| &self.records[index])
    }

    pub fn node_count(&self) -> usize {
        self.records.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.index_by_id
            .get(id)
            .map(|&index| self.bodies[index].position)
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index_by_id
            .get(id)
            .is_some_and(|&index| self.bodies[index].pinned)
    }

    pub fn on_select(&mut self, observer: impl FnMut(&NodeRecord) + 'static) {
        self.observers.on_select(Box::new(observer));
    }

    pub fn on_deselect(&mut self, observer: impl FnMut(&NodeRecord) + 'static) {
        self.observers.on_deselect(Box::new(observer));
    }

    pub fn selected(&self) -> Option<&NodeRecord> {
        self.selection
            .as_ref()
            .map(|selection| &self.records[selection.index])
    }

    pub fn is_neighbor_of_selection(&self, id: &str) -> bool {
        match (&self.selection, self.index_by_id.get(id)) {
            (Some(selection), Some(index)) => selection.neighbors.contains(index),
            _ => false,
        }
    }

    pub fn click_node(&mut self, id: &str) {
        if self.selected().is_some_and(|node| node.id == id) {
            self.deselect_node();
        } else {
            self.select_node(id);
        }
    }

    pub fn click_background(&mut self) {
        self.deselect_node();
    }

    pub fn select_node(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            debug!("select ignored for unknown node {id}");
            return false;
        };

        self.deselect_node();
        self.selection = Some(Selection {
            index,
            neighbors: neighbors_of(&self.links, index),
        });
        self.observers
            .emit(&SelectionEvent::Selected(self.records[index].clone()));
        self.viewport.center_on(self.bodies[index].position);
        true
    }

    pub fn deselect_node(&mut self) {
        if let Some(selection) = self.selection.take() {
            self.observers.emit(&SelectionEvent::Deselected(
                self.records[selection.index].clone(),
            ));
        }
    }

    pub fn node_at(&self, screen: Pos2) -> Option<&str> {
        let transform = self.viewport.transform();
        let world = transform.screen_to_world(screen);
        let radius_sq = self.config.node_radius * self.config.node_radius;
        self.bodies
            .iter()
            .enumerate()
            .rev()
            .find(|(_, body)| (body.position - world).length_sq() <= radius_sq)
            .map(|(index, _)| self.records[index].id.as_str())
    }

    pub fn drag_start(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        self.dragging = Some(index);
        self.bodies[index].pinned = true;
        self.bodies[index].velocity = Vec2::ZERO;
        self.simulation.set_alpha_target(self.config.reheat_alpha);
        self.simulation.restart();
        true
    }

    pub fn drag_to(&mut self, screen: Pos2) {
        let Some(index) = self.dragging else {
            return;
        };
        let world = self.viewport.transform().screen_to_world(screen);
        if world.is_finite() {
            self.bodies[index].position = world;
        }
    }

    /// Ends a drag. The node stays pinned at the drop point.
    pub fn drag_end(&mut self) {
        if self.dragging.take().is_some() {
            self.simulation.set_alpha_target(0.0);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.viewport.pan_by(delta);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.viewport.zoom(factor);
    }

    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        self.viewport.zoom_at(anchor, factor);
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset();
    }

    pub fn transform(&self) -> ViewTransform {
        self.viewport.transform()
    }

    pub fn resize(&mut self, size: Vec2) {
        if size == self.viewport.size() {
            return;
        }
        self.viewport.set_size(size);
        self.simulation.set_center(self.viewport.size() * 0.5);
        self.reheat();
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn alpha(&self) -> f32 {
        self.simulation.alpha()
    }

    pub fn is_settling(&self) -> bool {
        self.simulation.is_running()
    }

    pub fn tick(&mut self, dt: Duration) -> bool {
        let animating = self.viewport.advance(dt);

        if self.simulation.is_running() {
            let steps = ((dt.as_secs_f32() * 60.0).round() as usize).clamp(1, MAX_STEPS_PER_FRAME);
            for _ in 0..steps {
                if !self.simulation.step(&mut self.bodies) {
                    break;
                }
            }
        }

        animating || self.simulation.is_running()
    }

    fn reheat(&mut self) {
        self.simulation.set_alpha(self.config.reheat_alpha);
        self.simulation.restart();
    }
}
