use std::collections::VecDeque;

use crate::config::LayoutConfig;

use super::topology::Topology;

const MIN_RELAXATION_STEPS: usize = 64;

/// Least generation assignment satisfying `gen(child) >= gen(parent) + 1`
/// and `gen(a) == gen(b)` for spouses, normalized to start at 0.
///
/// Worklist relaxation: every person starts at 0 and is raised only when a
/// constraint demands it, so the fixed point does not depend on visiting
/// order. Parent edges are acyclic after [`Topology::build`]; a spouse who is
/// also a descendant can still push values up forever, hence the raise cap.
pub(super) fn assign_generations(topology: &Topology<'_>, config: &LayoutConfig) -> Vec<usize> {
    let n = topology.len();
    if n == 0 {
        return Vec::new();
    }
    let cap = config
        .max_relaxation_steps
        .unwrap_or_else(|| default_relaxation_cap(n));

    let mut generation = vec![0usize; n];
    let mut queued = vec![true; n];
    let mut worklist: VecDeque<usize> = (0..n).collect();
    let mut raises = 0usize;
    let mut capped = false;

    'relax: while let Some(node) = worklist.pop_front() {
        queued[node] = false;
        let level = generation[node];
        let bounds = topology.children[node]
            .iter()
            .map(|&child| (child, level + 1))
            .chain(topology.spouses[node].iter().map(|&spouse| (spouse, level)));
        for (target, floor) in bounds {
            if generation[target] >= floor {
                continue;
            }
            if raises >= cap {
                capped = true;
                break 'relax;
            }
            generation[target] = floor;
            raises += 1;
            if !queued[target] {
                queued[target] = true;
                worklist.push_back(target);
            }
        }
    }

    if capped {
        tracing::warn!(
            cap,
            "generation relaxation hit its iteration cap; keeping best-effort generations"
        );
    }

    let min = generation.iter().copied().min().unwrap_or(0);
    if min > 0 {
        for level in &mut generation {
            *level -= min;
        }
    }
    tracing::debug!(
        persons = n,
        raises,
        depth = generation.iter().copied().max().unwrap_or(0) + 1,
        "assigned generations"
    );
    generation
}

fn default_relaxation_cap(n: usize) -> usize {
    n.saturating_mul(n).saturating_add(n).max(MIN_RELAXATION_STEPS)
}
