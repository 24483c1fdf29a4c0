use std::cmp::Ordering;

use crate::config::LayoutConfig;

use super::topology::Topology;

/// Slack under which two nodes are considered exactly at their minimum gap.
pub(super) const EPSILON: f32 = 1e-3;
const MAX_SAFE_OFFSET_PROBES: usize = 4096;

/// Minimum centre-to-centre distances between horizontal neighbours.
#[derive(Debug, Clone, Copy)]
pub(super) struct Spacing<'a> {
    topology: &'a Topology<'a>,
    config: &'a LayoutConfig,
}

impl<'a> Spacing<'a> {
    pub fn new(topology: &'a Topology<'a>, config: &'a LayoutConfig) -> Self {
        Self { topology, config }
    }

    pub fn gap(&self, a: usize, b: usize) -> f32 {
        if self.topology.are_spouses(a, b) {
            self.config.spouse_spacing
        } else if self.topology.share_parent(a, b) {
            self.config.sibling_spacing
        } else {
            self.config.horizontal_spacing
        }
    }

    pub fn min_distance(&self, a: usize, b: usize) -> f32 {
        self.config.node_width + self.gap(a, b)
    }
}

/// Row members sorted by position, ties broken by order index.
pub(super) fn sorted_by_position(
    row: &[usize],
    order: &[usize],
    position: impl Fn(usize) -> f32,
) -> Vec<usize> {
    let mut sorted = row.to_vec();
    sorted.sort_by(|&a, &b| {
        position(a)
            .partial_cmp(&position(b))
            .unwrap_or(Ordering::Equal)
            .then(order[a].cmp(&order[b]))
    });
    sorted
}

/// Sum over adjacent pairs of how far each pair falls short of its gap.
pub(super) fn overlap_deficit(
    row: &[usize],
    order: &[usize],
    spacing: &Spacing<'_>,
    position: impl Fn(usize) -> f32,
) -> f32 {
    let sorted = sorted_by_position(row, order, &position);
    sorted
        .windows(2)
        .map(|pair| {
            let needed = spacing.min_distance(pair[0], pair[1]);
            (needed - (position(pair[1]) - position(pair[0]))).max(0.0)
        })
        .filter(|deficit| *deficit > EPSILON)
        .sum()
}

pub(super) fn detect_collisions(
    row: &[usize],
    x: &[f32],
    order: &[usize],
    spacing: &Spacing<'_>,
) -> bool {
    let sorted = sorted_by_position(row, order, |i| x[i]);
    sorted
        .windows(2)
        .any(|pair| x[pair[1]] - x[pair[0]] < spacing.min_distance(pair[0], pair[1]) - EPSILON)
}

/// Cascades left to right: a node short of its gap moves right by the exact
/// deficit, dragging everything to its right along. Returns the number of
/// shifts applied.
pub(super) fn resolve_collisions(
    row: &[usize],
    x: &mut [f32],
    order: &[usize],
    spacing: &Spacing<'_>,
) -> usize {
    let sorted = sorted_by_position(row, order, |i| x[i]);
    let mut shifts = 0;
    for idx in 1..sorted.len() {
        let (left, right) = (sorted[idx - 1], sorted[idx]);
        let deficit = x[left] + spacing.min_distance(left, right) - x[right];
        if deficit > EPSILON {
            for &later in &sorted[idx..] {
                x[later] += deficit;
            }
            shifts += 1;
        }
    }
    shifts
}

/// Largest shift toward `desired` that moves `group` without adding overlap
/// to the row.
///
/// Linear probe in `step` increments, capped at `|desired|`; the first probe
/// that raises the row's overlap ends the search. This is coarse on purpose:
/// a group stops up to one step short of the ideal spot, and the small
/// increments keep it from jumping over a neighbour.
pub(super) fn safe_offset(
    row: &[usize],
    group: &[usize],
    x: &[f32],
    order: &[usize],
    spacing: &Spacing<'_>,
    desired: f32,
    step: f32,
) -> f32 {
    let magnitude = desired.abs();
    if !magnitude.is_finite() || magnitude <= EPSILON || group.is_empty() {
        return 0.0;
    }
    let sign = desired.signum();
    let mut step = if step.is_finite() && step > 0.0 {
        step
    } else {
        magnitude
    };
    if magnitude / step > MAX_SAFE_OFFSET_PROBES as f32 {
        step = magnitude / MAX_SAFE_OFFSET_PROBES as f32;
    }
    let probes = (magnitude / step).ceil().max(1.0) as usize;

    let baseline = overlap_deficit(row, order, spacing, |i| x[i]);
    let mut accepted = 0.0;
    for k in 1..=probes {
        let probe = (k as f32 * step).min(magnitude);
        let delta = sign * probe;
        let deficit = overlap_deficit(row, order, spacing, |i| {
            if group.contains(&i) { x[i] + delta } else { x[i] }
        });
        if deficit > baseline + EPSILON {
            break;
        }
        accepted = probe;
    }
    sign * accepted
}
