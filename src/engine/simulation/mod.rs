mod forces;
mod quadtree;

use eframe::egui::Vec2;

use crate::config::EngineConfig;
use forces::{accumulate_charge, accumulate_collision_pairs, apply_center, apply_springs};
use quadtree::QuadNode;

const BARNES_HUT_THETA_SQ: f32 = 0.81;
const COLLISION_STRENGTH: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub pinned: bool,
}

impl Body {
    pub fn free(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            pinned: false,
        }
    }

    pub fn pinned(position: Vec2) -> Self {
        Self {
            pinned: true,
            ..Self::free(position)
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    /// 1 / min(degree) so hubs are not torn apart by their many links.
    strength: f32,
    bias: f32,
}

#[derive(Clone, Copy, Debug)]
struct Params {
    link_distance: f32,
    charge_strength: f32,
    collision_radius: f32,
    center_strength: f32,
    alpha_min: f32,
    alpha_decay: f32,
    velocity_decay: f32,
}

impl From<&EngineConfig> for Params {
    fn from(config: &EngineConfig) -> Self {
        Self {
            link_distance: config.link_distance,
            charge_strength: config.charge_strength,
            collision_radius: config.node_radius * config.collision_radius_factor,
            center_strength: config.center_strength,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            velocity_decay: config.velocity_decay,
        }
    }
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    deltas: Vec<Vec2>,
}

pub struct Simulation {
    params: Params,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    springs: Vec<Spring>,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            params: Params::from(config),
            center: Vec2::ZERO,
            alpha: 1.0,
            alpha_target: 0.0,
            running: false,
            springs: Vec::new(),
            scratch: Scratch::default(),
        }
    }

    pub fn set_links(&mut self, node_count: usize, pairs: impl IntoIterator<Item = (usize, usize)>) {
        let pairs = pairs
            .into_iter()
            .filter(|&(source, target)| {
                source != target && source < node_count && target < node_count
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0_u32; node_count];
        for &(source, target) in &pairs {
            degree[source] += 1;
            degree[target] += 1;
        }

        self.springs = pairs
            .into_iter()
            .map(|(source, target)| {
                let source_degree = degree[source] as f32;
                let target_degree = degree[target] as f32;
                Spring {
                    source,
                    target,
                    strength: 1.0 / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();
    }

    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn restart(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn step(&mut self, bodies: &mut [Body]) -> bool {
        if !self.running {
            return false;
        }

        self.tick(bodies);
        if self.alpha < self.params.alpha_min {
            self.running = false;
        }
        true
    }

    fn tick(&mut self, bodies: &mut [Body]) {
        let params = self.params;
        self.alpha += (self.alpha_target - self.alpha) * params.alpha_decay;
        let alpha = self.alpha;

        apply_springs(&self.springs, bodies, params.link_distance, alpha);
        self.apply_charge(bodies, alpha);
        apply_center(bodies, self.center, params.center_strength);
        self.apply_collision(bodies);

        for body in bodies.iter_mut() {
            if body.pinned {
                body.velocity = Vec2::ZERO;
                continue;
            }
            body.velocity *= 1.0 - params.velocity_decay;
            body.position += body.velocity;
        }
    }

    fn apply_charge(&mut self, bodies: &mut [Body], alpha: f32) {
        if bodies.len() < 2 || self.params.charge_strength == 0.0 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        for body in bodies.iter() {
            scratch.positions.push(body.position);
            scratch.radii.push(0.0);
        }

        let Some(tree) = QuadNode::build(&scratch.positions, &scratch.radii) else {
            return;
        };

        let strength = self.params.charge_strength * alpha;
        for (index, body) in bodies.iter_mut().enumerate() {
            if body.pinned {
                continue;
            }
            let mut velocity = Vec2::ZERO;
            accumulate_charge(
                &tree,
                index,
                &scratch.positions,
                strength,
                BARNES_HUT_THETA_SQ,
                &mut velocity,
            );
            body.velocity += velocity;
        }
    }

    fn apply_collision(&mut self, bodies: &mut [Body]) {
        let radius = self.params.collision_radius;
        if bodies.len() < 2 || radius <= 0.0 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        for body in bodies.iter() {
            scratch.positions.push(body.position + body.velocity);
            scratch.radii.push(radius);
        }

        let Some(tree) = QuadNode::build(&scratch.positions, &scratch.radii) else {
            return;
        };

        scratch.deltas.clear();
        scratch.deltas.resize(bodies.len(), Vec2::ZERO);
        accumulate_collision_pairs(
            &tree,
            &tree,
            true,
            &scratch.positions,
            &scratch.radii,
            COLLISION_STRENGTH,
            &mut scratch.deltas,
        );

        for (body, delta) in bodies.iter_mut().zip(&scratch.deltas) {
            body.velocity += *delta;
        }
    }
}
