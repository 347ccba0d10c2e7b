use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use log::{debug, warn};

use super::simulation::Body;
use crate::topology::{LinkRecord, NodeRecord};

const PHYLLOTAXIS_RADIUS: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub(super) struct BoundLink {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) record: LinkRecord,
}

impl BoundLink {
    pub(super) fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }
}

pub(super) struct Binding {
    pub(super) records: Vec<NodeRecord>,
    pub(super) bodies: Vec<Body>,
    pub(super) index_by_id: HashMap<String, usize>,
    pub(super) links: Vec<BoundLink>,
}

pub(super) fn phyllotaxis(index: usize, center: Vec2) -> Vec2 {
    let angle = index as f32 * PI * (3.0 - 5.0_f32.sqrt());
    let radius = PHYLLOTAXIS_RADIUS * (0.5 + index as f32).sqrt();
    center + vec2(angle.cos(), angle.sin()) * radius
}

/// Resolves records into simulation bodies and index-based links.
///
/// Placement precedence: a record's own `x`/`y` (pinned there), then the
/// body of the same id from the previous binding (kept pinned), then a free
/// spiral slot. Duplicate ids keep the first record; links with an unknown
/// endpoint are dropped.
pub(super) fn bind(
    nodes: &[NodeRecord],
    links: &[LinkRecord],
    previous: &HashMap<String, Vec2>,
    center: Vec2,
) -> Binding {
    let mut records = Vec::with_capacity(nodes.len());
    let mut bodies = Vec::with_capacity(nodes.len());
    let mut index_by_id = HashMap::with_capacity(nodes.len());

    for node in nodes {
        if index_by_id.contains_key(&node.id) {
            warn!("ignoring duplicate node id {}", node.id);
            continue;
        }

        let index = records.len();
        let body = match node.position() {
            Some((x, y)) => Body::pinned(vec2(x, y)),
            None => match previous.get(&node.id) {
                Some(&position) => Body::pinned(position),
                None => Body::free(phyllotaxis(index, center)),
            },
        };

        index_by_id.insert(node.id.clone(), index);
        records.push(node.clone());
        bodies.push(body);
    }

    let mut bound = Vec::with_capacity(links.len());
    let mut dropped = 0_usize;
    for link in links {
        match (index_by_id.get(&link.source), index_by_id.get(&link.target)) {
            (Some(&source), Some(&target)) => bound.push(BoundLink {
                source,
                target,
                record: link.clone(),
            }),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("dropped {dropped} link(s) with unknown endpoints");
    }

    Binding {
        records,
        bodies,
        index_by_id,
        links: bound,
    }
}

pub(super) fn neighbors_of(links: &[BoundLink], index: usize) -> HashSet<usize> {
    links
        .iter()
        .filter_map(|link| {
            if link.source == index {
                Some(link.target)
            } else if link.target == index {
                Some(link.source)
            } else {
                None
            }
        })
        .filter(|&neighbor| neighbor != index)
        .collect()
}
