use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::ir::Pedigree;

use super::topology::Topology;

/// One or two parents with their direct children. Rebuilt on every pass.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct FamilyUnit {
    pub parents: Vec<usize>,
    pub children: Vec<usize>,
    pub generation: usize,
    /// Width needed to draw the parents and the children side by side.
    pub min_width: f32,
    /// True when no relationship record backs the unit.
    pub synthesized: bool,
}

impl FamilyUnit {
    fn new(parents: Vec<usize>, synthesized: bool) -> Self {
        Self {
            parents,
            children: Vec::new(),
            generation: 0,
            min_width: 0.0,
            synthesized,
        }
    }

    pub fn has_parent(&self, person: usize) -> bool {
        self.parents.contains(&person)
    }

    pub fn parent_row_width(&self, config: &LayoutConfig) -> f32 {
        row_width(self.parents.len(), config.node_width, config.spouse_spacing)
    }

    /// Extra room the children need beyond the parents, split evenly to
    /// both sides of the parent row.
    pub fn side_slack(&self, config: &LayoutConfig) -> f32 {
        ((self.min_width - self.parent_row_width(config)) / 2.0).max(0.0)
    }
}

pub(super) fn row_width(count: usize, node_width: f32, gap: f32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    count as f32 * node_width + (count - 1) as f32 * gap
}

fn pair_key(parents: &[usize]) -> (usize, usize) {
    match parents {
        [single] => (*single, *single),
        [a, b, ..] => ((*a).min(*b), (*a).max(*b)),
        [] => (usize::MAX, usize::MAX),
    }
}

/// One unit per relationship (relationships joining the same pair merge),
/// then synthesized units for children no relationship claims, keyed by the
/// child's first two parents.
pub(super) fn build_family_units(
    pedigree: &Pedigree,
    topology: &Topology<'_>,
    generation: &[usize],
    config: &LayoutConfig,
) -> Vec<FamilyUnit> {
    let n = topology.len();
    let mut units: Vec<FamilyUnit> = Vec::new();
    let mut by_pair: HashMap<(usize, usize), usize> = HashMap::new();
    let mut claimed = vec![false; n];

    for rel in &pedigree.relationships {
        let mut partners: Vec<usize> = [&rel.person1, &rel.person2]
            .into_iter()
            .filter_map(|id| topology.index_of(id))
            .collect();
        partners.dedup();
        if partners.is_empty() {
            tracing::debug!(relationship = %rel.id, "relationship has no known partner");
            continue;
        }
        let slot = *by_pair.entry(pair_key(&partners)).or_insert_with(|| {
            units.push(FamilyUnit::new(partners.clone(), false));
            units.len() - 1
        });
        for child in &rel.children {
            let Some(c) = topology.index_of(child) else {
                continue;
            };
            if claimed[c] || !partners.iter().any(|&p| topology.is_child_of(c, p)) {
                continue;
            }
            claimed[c] = true;
            units[slot].children.push(c);
        }
    }

    for child in 0..n {
        if claimed[child] || topology.parents[child].is_empty() {
            continue;
        }
        let parents: Vec<usize> = topology.parents[child].iter().copied().take(2).collect();
        let slot = *by_pair.entry(pair_key(&parents)).or_insert_with(|| {
            units.push(FamilyUnit::new(parents.clone(), true));
            units.len() - 1
        });
        claimed[child] = true;
        units[slot].children.push(child);
    }

    for unit in &mut units {
        unit.generation = unit
            .parents
            .iter()
            .map(|&p| generation[p])
            .min()
            .unwrap_or(0);
        let children_width = row_width(
            unit.children.len(),
            config.node_width,
            config.sibling_spacing,
        );
        unit.min_width = unit.parent_row_width(config).max(children_width);
    }

    units
}
