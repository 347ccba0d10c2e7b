use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::{Body, Spring};

const DISTANCE_MIN_SQ: f32 = 1.0;
const JIGGLE: f32 = 1.0e-3;

/// Tiny, deterministic separation for coincident points.
pub(super) fn jiggle(a: usize, b: usize) -> Vec2 {
    let (low, high, sign) = if a <= b { (a, b, 1.0) } else { (b, a, -1.0) };
    let turn = (low as f32 * 0.618_034 + high as f32 * 0.414_214 + 0.37).fract();
    let angle = turn * TAU;
    vec2(angle.cos(), angle.sin()) * (JIGGLE * sign)
}

pub(super) fn apply_springs(springs: &[Spring], bodies: &mut [Body], distance: f32, alpha: f32) {
    for spring in springs {
        let source = bodies[spring.source];
        let target = bodies[spring.target];

        let mut delta = (target.position + target.velocity) - (source.position + source.velocity);
        if delta.length_sq() == 0.0 {
            delta = jiggle(spring.source, spring.target);
        }
        let length = delta.length();
        let correction = delta * ((length - distance) / length * alpha * spring.strength);

        bodies[spring.target].velocity -= correction * spring.bias;
        bodies[spring.source].velocity += correction * (1.0 - spring.bias);
    }
}

pub(super) fn accumulate_charge(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta_sq: f32,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            let mut length_sq = delta.length_sq();
            if length_sq == 0.0 {
                delta = jiggle(index, other);
                length_sq = delta.length_sq();
            }
            *velocity += delta * (strength / softened(length_sq));
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let length_sq = delta.length_sq();
    let width = node.bounds.side_length();
    if !node.bounds.contains(point) && width * width / theta_sq < length_sq {
        *velocity += delta * (strength * node.mass / softened(length_sq));
        return;
    }

    for child in node.children() {
        accumulate_charge(child, index, positions, strength, theta_sq, velocity);
    }
}

fn softened(length_sq: f32) -> f32 {
    if length_sq < DISTANCE_MIN_SQ {
        (DISTANCE_MIN_SQ * length_sq).sqrt()
    } else {
        length_sq
    }
}

pub(super) fn apply_center(bodies: &mut [Body], center: Vec2, strength: f32) {
    if bodies.is_empty() {
        return;
    }

    let mut mean = Vec2::ZERO;
    for body in bodies.iter() {
        mean += body.position;
    }
    mean /= bodies.len() as f32;

    let shift = (mean - center) * strength;
    for body in bodies.iter_mut().filter(|body| !body.pinned) {
        body.position -= shift;
    }
}

pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    deltas: &mut [Vec2],
) {
    let reach = node_a.max_radius + node_b.max_radius;
    if node_a.bounds.distance_sq_to(node_b.bounds) > reach * reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    collide(from, to, predicted, radii, strength, deltas);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    collide(from, to, predicted, radii, strength, deltas);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_deref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, predicted, radii, strength, deltas);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_deref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, predicted, radii, strength, deltas,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(child, node_b, false, predicted, radii, strength, deltas);
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(node_a, child, false, predicted, radii, strength, deltas);
        }
    }
}

fn collide(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    deltas: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    if reach <= 0.0 {
        return;
    }

    let mut delta = predicted[from] - predicted[to];
    let mut length_sq = delta.length_sq();
    if length_sq >= reach * reach {
        return;
    }
    if length_sq == 0.0 {
        delta = jiggle(from, to);
        length_sq = delta.length_sq();
    }

    let length = length_sq.sqrt();
    let push = delta * ((reach - length) / length * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = to_sq / (from_sq + to_sq);

    deltas[from] += push * share;
    deltas[to] -= push * (1.0 - share);
}
