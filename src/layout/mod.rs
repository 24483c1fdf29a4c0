mod collision;
mod family;
mod generation;
mod ordering;
mod position;
mod topology;
pub(crate) mod types;
pub use types::*;

use std::collections::BTreeMap;

use crate::config::{LayoutConfig, LayoutOptions};
use crate::ir::Pedigree;

use family::build_family_units;
use generation::assign_generations;
use ordering::order_generations;
use position::Arrangement;
use topology::Topology;

/// Holds layout options between passes; the pedigree itself is borrowed per
/// call and never modified.
#[derive(Debug, Clone, Default)]
pub struct PedigreeLayouter {
    config: LayoutConfig,
}

impl PedigreeLayouter {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn options(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn set_options(&mut self, options: &LayoutOptions) {
        self.config.apply(options);
    }

    pub fn layout(&self, pedigree: &Pedigree) -> Layout {
        compute_layout(pedigree, &self.config)
    }
}

pub fn compute_layout(pedigree: &Pedigree, config: &LayoutConfig) -> Layout {
    if pedigree.is_empty() {
        return Layout::default();
    }

    let topology = Topology::build(pedigree);
    let generation = assign_generations(&topology, config);
    let units = build_family_units(pedigree, &topology, &generation, config);
    let rows = order_generations(&topology, &generation, &units);
    tracing::debug!(
        persons = topology.len(),
        generations = rows.len(),
        units = units.len(),
        cut_edges = topology.cut_edges,
        synthesized = units.iter().filter(|unit| unit.synthesized).count(),
        "pedigree layout pass"
    );

    let mut arrangement = Arrangement::new(&topology, config, &generation, rows);
    arrangement.assign_initial(&units);
    arrangement.center_parents(&units);
    arrangement.center_children(&units);
    arrangement.settle_rows();
    arrangement.finalize_order();

    let mut nodes: BTreeMap<String, LayoutNode> = BTreeMap::new();
    for (idx, id) in topology.ids.iter().enumerate() {
        nodes.insert(
            id.to_string(),
            LayoutNode {
                id: id.to_string(),
                sex: topology.sex[idx],
                x: arrangement.x[idx],
                y: arrangement.y_for(generation[idx]),
                width: config.node_width,
                height: config.node_height,
                generation: generation[idx],
                order: arrangement.order[idx],
            },
        );
    }
    let generations: Vec<Vec<String>> = arrangement
        .rows
        .iter()
        .map(|row| row.iter().map(|&idx| topology.ids[idx].to_string()).collect())
        .collect();

    let bounds = center_layout(&mut nodes, config);
    Layout {
        nodes,
        generations,
        bounds,
    }
}

/// Translates every node so the bounding box is centred on x = 0 with its
/// top edge at `top_margin`.
fn center_layout(nodes: &mut BTreeMap<String, LayoutNode>, config: &LayoutConfig) -> Bounds {
    let Some(bounds) = Bounds::of(nodes.values()) else {
        return Bounds::default();
    };
    let shift_x = -bounds.center_x();
    let shift_y = config.top_margin - bounds.min_y;
    if shift_x == 0.0 && shift_y == 0.0 {
        return bounds;
    }
    for node in nodes.values_mut() {
        node.x += shift_x;
        node.y += shift_y;
    }
    Bounds {
        min_x: bounds.min_x + shift_x,
        min_y: bounds.min_y + shift_y,
        max_x: bounds.max_x + shift_x,
        max_y: bounds.max_y + shift_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Relationship, Sex};

    #[test]
    fn empty_pedigree_gives_empty_layout() {
        let layout = compute_layout(&Pedigree::new(), &LayoutConfig::default());
        assert!(layout.is_empty());
        assert!(layout.generations.is_empty());
    }

    #[test]
    fn single_founder_sits_at_origin() {
        let mut pedigree = Pedigree::new();
        pedigree.ensure_person("only", Sex::Female);
        let layout = compute_layout(&pedigree, &LayoutConfig::default());
        let node = layout.node("only").unwrap();
        assert_eq!(node.x, 0.0);
        assert_eq!(node.top(), 20.0);
        assert_eq!(node.generation, 0);
        assert_eq!(node.order, 0);
        assert_eq!(layout.bounds.min_x, -25.0);
    }

    #[test]
    fn set_options_changes_spacing() {
        let mut pedigree = Pedigree::new();
        pedigree.ensure_person("A", Sex::Male);
        pedigree.ensure_person("B", Sex::Female);
        pedigree.add_relationship(Relationship::new("r", "A", "B")).unwrap();

        let mut layouter = PedigreeLayouter::default();
        layouter.set_options(&LayoutOptions {
            spouse_spacing: Some(100.0),
            node_width: Some(40.0),
            ..Default::default()
        });
        assert_eq!(layouter.options().spouse_spacing, 100.0);
        let layout = layouter.layout(&pedigree);
        let a = layout.node("A").unwrap();
        let b = layout.node("B").unwrap();
        assert_eq!(b.x - a.x, 140.0);
        assert_eq!(a.width, 40.0);
    }

    #[test]
    fn relocate_moves_one_node() {
        let mut pedigree = Pedigree::new();
        pedigree.ensure_person("A", Sex::Male);
        pedigree.ensure_person("B", Sex::Female);
        let mut layout = compute_layout(&pedigree, &LayoutConfig::default());
        let before_b = layout.node("B").unwrap().clone();
        assert!(layout.relocate("A", 500.0, 700.0));
        assert!(!layout.relocate("nobody", 0.0, 0.0));
        let a = layout.node("A").unwrap();
        assert_eq!((a.x, a.y), (500.0, 700.0));
        assert_eq!(layout.node("B").unwrap(), &before_b);
        assert_eq!(layout.bounds.max_x, 525.0);
    }
}
