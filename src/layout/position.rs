use crate::config::LayoutConfig;

use super::collision::{Spacing, detect_collisions, resolve_collisions, safe_offset};
use super::family::{FamilyUnit, row_width};
use super::topology::Topology;

/// Working positions for one layout pass. `x` is indexed by person.
pub(super) struct Arrangement<'a> {
    topology: &'a Topology<'a>,
    config: &'a LayoutConfig,
    spacing: Spacing<'a>,
    generation: &'a [usize],
    pub rows: Vec<Vec<usize>>,
    pub order: Vec<usize>,
    pub x: Vec<f32>,
}

impl<'a> Arrangement<'a> {
    pub fn new(
        topology: &'a Topology<'a>,
        config: &'a LayoutConfig,
        generation: &'a [usize],
        rows: Vec<Vec<usize>>,
    ) -> Self {
        let n = topology.len();
        let mut order = vec![0; n];
        for row in &rows {
            for (idx, &person) in row.iter().enumerate() {
                order[person] = idx;
            }
        }
        Self {
            topology,
            config,
            spacing: Spacing::new(topology, config),
            generation,
            rows,
            order,
            x: vec![0.0; n],
        }
    }

    pub fn y_for(&self, level: usize) -> f32 {
        self.config.top_margin + self.config.node_height / 2.0 + level as f32 * self.config.row_height()
    }

    /// First placement, top row to bottom row. Each person sits at the
    /// minimum legal distance from its left neighbour, or further right when
    /// its parents are already placed and the sibling row centred under them
    /// asks for it. Units whose children are wider than the parents reserve
    /// half the difference on each side of the parent row.
    pub fn assign_initial(&mut self, units: &[FamilyUnit]) {
        let n = self.topology.len();
        let mut child_unit: Vec<Option<usize>> = vec![None; n];
        for (ui, unit) in units.iter().enumerate() {
            for &child in &unit.children {
                child_unit[child].get_or_insert(ui);
            }
        }
        let mut placed = vec![false; n];

        for level in 0..self.rows.len() {
            let row = self.rows[level].clone();
            let (lead, trail) = self.parent_slack(level, units);
            let mut previous: Option<usize> = None;
            for &person in &row {
                let min_legal = previous.map(|prev| {
                    self.x[prev] + self.spacing.min_distance(prev, person) + trail[prev] + lead[person]
                });
                let candidate = if level > 0 {
                    child_unit[person]
                        .and_then(|ui| self.sibling_candidate(person, level, &units[ui], &placed))
                } else {
                    None
                };
                self.x[person] = match (min_legal, candidate) {
                    (Some(min), Some(c)) => c.max(min),
                    (Some(min), None) => min,
                    (None, Some(c)) => c,
                    (None, None) => 0.0,
                };
                placed[person] = true;
                previous = Some(person);
            }
        }
    }

    fn parent_slack(&self, level: usize, units: &[FamilyUnit]) -> (Vec<f32>, Vec<f32>) {
        let n = self.topology.len();
        let mut lead = vec![0.0_f32; n];
        let mut trail = vec![0.0_f32; n];
        for unit in units.iter().filter(|unit| unit.generation == level) {
            if unit.children.is_empty()
                || unit.parents.iter().any(|&p| self.generation[p] != level)
            {
                continue;
            }
            let slack = unit.side_slack(self.config);
            if slack <= 0.0 {
                continue;
            }
            let first = unit.parents.iter().copied().min_by_key(|&p| self.order[p]);
            let last = unit.parents.iter().copied().max_by_key(|&p| self.order[p]);
            if let (Some(first), Some(last)) = (first, last) {
                lead[first] = lead[first].max(slack);
                trail[last] = trail[last].max(slack);
            }
        }
        (lead, trail)
    }

    fn sibling_candidate(
        &self,
        person: usize,
        level: usize,
        unit: &FamilyUnit,
        placed: &[bool],
    ) -> Option<f32> {
        let parents: Vec<f32> = unit
            .parents
            .iter()
            .filter(|&&p| placed[p])
            .map(|&p| self.x[p])
            .collect();
        let midpoint = span_midpoint(&parents)?;
        let mut siblings: Vec<usize> = unit
            .children
            .iter()
            .copied()
            .filter(|&c| self.generation[c] == level)
            .collect();
        siblings.sort_by_key(|&c| self.order[c]);
        let index = siblings.iter().position(|&c| c == person)?;
        let width = row_width(siblings.len(), self.config.node_width, self.config.sibling_spacing);
        let first = midpoint - width / 2.0 + self.config.node_width / 2.0;
        Some(first + index as f32 * (self.config.node_width + self.config.sibling_spacing))
    }

    /// Bottom row to top row: moves each unit's parents toward the midpoint
    /// of their children, as far as the row allows. A parent with children in
    /// several units stays put and its partner takes the whole shift, so the
    /// other units of that parent stay centred.
    pub fn center_parents(&mut self, units: &[FamilyUnit]) {
        let mut families = vec![0_usize; self.topology.len()];
        for unit in units.iter().filter(|unit| !unit.children.is_empty()) {
            for &parent in &unit.parents {
                families[parent] += 1;
            }
        }
        for level in (0..self.rows.len()).rev() {
            for unit in units.iter().filter(|unit| unit.generation == level) {
                if unit.children.is_empty() {
                    continue;
                }
                let movers: Vec<usize> = unit
                    .parents
                    .iter()
                    .copied()
                    .filter(|&p| self.generation[p] == level)
                    .collect();
                let children: Vec<f32> = unit.children.iter().map(|&c| self.x[c]).collect();
                let parents: Vec<f32> = movers.iter().map(|&p| self.x[p]).collect();
                let (Some(target), Some(current)) =
                    (span_midpoint(&children), span_midpoint(&parents))
                else {
                    continue;
                };
                let free: Vec<usize> = movers
                    .iter()
                    .copied()
                    .filter(|&p| families[p] <= 1)
                    .collect();
                if movers.len() == 2 && free.len() == 1 {
                    self.shift_group(level, &free, 2.0 * (target - current));
                } else {
                    self.shift_group(level, &movers, target - current);
                }
            }
            self.resolve_row(level);
        }
    }

    /// Top row to bottom row: moves each sibling group, with spouses who
    /// married in, toward the midpoint of its parents.
    pub fn center_children(&mut self, units: &[FamilyUnit]) {
        for level in 1..self.rows.len() {
            for unit in units {
                let siblings: Vec<usize> = unit
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| self.generation[c] == level)
                    .collect();
                let parents: Vec<f32> = unit.parents.iter().map(|&p| self.x[p]).collect();
                let children: Vec<f32> = siblings.iter().map(|&c| self.x[c]).collect();
                let (Some(target), Some(current)) =
                    (span_midpoint(&parents), span_midpoint(&children))
                else {
                    continue;
                };
                let mut group = siblings.clone();
                for &sibling in &siblings {
                    for &spouse in &self.topology.spouses[sibling] {
                        if self.generation[spouse] == level
                            && self.topology.parents[spouse].is_empty()
                            && !group.contains(&spouse)
                        {
                            group.push(spouse);
                        }
                    }
                }
                self.shift_group(level, &group, target - current);
            }
            self.resolve_row(level);
        }
    }

    fn shift_group(&mut self, level: usize, group: &[usize], desired: f32) {
        let offset = safe_offset(
            &self.rows[level],
            group,
            &self.x,
            &self.order,
            &self.spacing,
            desired,
            self.config.safe_offset_step,
        );
        if offset != 0.0 {
            for &person in group {
                self.x[person] += offset;
            }
        }
    }

    pub fn row_has_collisions(&self, level: usize) -> bool {
        detect_collisions(&self.rows[level], &self.x, &self.order, &self.spacing)
    }

    pub fn resolve_row(&mut self, level: usize) -> usize {
        resolve_collisions(&self.rows[level], &mut self.x, &self.order, &self.spacing)
    }

    /// Bounded resolution of every row; rows still overlapping after
    /// `max_collision_passes` rounds are accepted as they are.
    pub fn settle_rows(&mut self) {
        let passes = self.config.max_collision_passes.max(1);
        for level in 0..self.rows.len() {
            for _ in 0..passes {
                if !self.row_has_collisions(level) {
                    break;
                }
                self.resolve_row(level);
            }
            if self.row_has_collisions(level) {
                tracing::warn!(
                    generation = level,
                    passes,
                    "collisions remain after the iteration cap"
                );
            }
        }
    }

    /// Re-sorts every row by final x and refreshes the order indices.
    pub fn finalize_order(&mut self) {
        for row in &mut self.rows {
            let x = &self.x;
            let order = &self.order;
            row.sort_by(|&a, &b| {
                x[a].partial_cmp(&x[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(order[a].cmp(&order[b]))
            });
        }
        for row in &self.rows {
            for (idx, &person) in row.iter().enumerate() {
                self.order[person] = idx;
            }
        }
    }
}

fn span_midpoint(values: &[f32]) -> Option<f32> {
    let min = values.iter().copied().reduce(f32::min)?;
    let max = values.iter().copied().reduce(f32::max)?;
    Some((min + max) / 2.0)
}
