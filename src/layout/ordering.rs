use super::family::FamilyUnit;
use super::topology::Topology;

/// Left-to-right order of person indices per generation.
///
/// Persons are first packed into groups: a person with several partners
/// gets `[first partner, person, other partners...]`, everyone else
/// `[person, spouses...]`. Groups are then emitted per generation in
/// first-encountered order, where a child is encountered when the row above
/// reaches one of its parents, so siblings end up next to each other.
pub(super) fn order_generations(
    topology: &Topology<'_>,
    generation: &[usize],
    units: &[FamilyUnit],
) -> Vec<Vec<usize>> {
    let n = topology.len();
    if n == 0 {
        return Vec::new();
    }
    let groups = build_groups(topology, generation, units);
    let mut group_of = vec![usize::MAX; n];
    for (gi, group) in groups.iter().enumerate() {
        for &person in group {
            group_of[person] = gi;
        }
    }

    let mut units_by_parent: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (ui, unit) in units.iter().enumerate() {
        for &parent in &unit.parents {
            units_by_parent[parent].push(ui);
        }
    }

    let depth = generation.iter().copied().max().unwrap_or(0) + 1;
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); depth];
    let mut emitted = vec![false; groups.len()];

    for level in 0..depth {
        let mut row: Vec<usize> = Vec::new();
        let mut emit = |person: usize, row: &mut Vec<usize>| {
            let gi = group_of[person];
            if generation[person] != level || gi == usize::MAX || emitted[gi] {
                return;
            }
            emitted[gi] = true;
            row.extend(groups[gi].iter().copied());
        };

        for above in (0..level).rev() {
            for &parent in &rows[above] {
                for &ui in &units_by_parent[parent] {
                    for &child in &units[ui].children {
                        emit(child, &mut row);
                    }
                }
            }
        }
        for person in 0..n {
            emit(person, &mut row);
        }
        rows[level] = row;
    }

    rows
}

fn build_groups(
    topology: &Topology<'_>,
    generation: &[usize],
    units: &[FamilyUnit],
) -> Vec<Vec<usize>> {
    let n = topology.len();
    let mut parent_units = vec![0usize; n];
    for unit in units {
        for &parent in &unit.parents {
            parent_units[parent] += 1;
        }
    }

    let partners_of = |person: usize| -> Vec<usize> {
        let mut partners: Vec<usize> = Vec::new();
        let from_units = units
            .iter()
            .filter(|unit| unit.has_parent(person))
            .flat_map(|unit| unit.parents.iter().copied());
        for other in from_units.chain(topology.spouses[person].iter().copied()) {
            if other != person && generation[other] == generation[person] && !partners.contains(&other)
            {
                partners.push(other);
            }
        }
        partners
    };

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: Vec<Option<usize>> = vec![None; n];

    let shared = (0..n).filter(|&p| parent_units[p] > 1 || topology.spouses[p].len() > 1);
    for person in shared {
        let free: Vec<usize> = partners_of(person)
            .into_iter()
            .filter(|&other| group_of[other].is_none())
            .collect();
        let gi = match group_of[person] {
            Some(gi) => {
                groups[gi].extend(free.iter().copied());
                gi
            }
            None => {
                let mut group = Vec::with_capacity(free.len() + 1);
                match free.split_first() {
                    Some((first, rest)) => {
                        group.push(*first);
                        group.push(person);
                        group.extend(rest.iter().copied());
                    }
                    None => group.push(person),
                }
                groups.push(group);
                groups.len() - 1
            }
        };
        for &member in &groups[gi] {
            group_of[member] = Some(gi);
        }
    }

    for person in 0..n {
        if group_of[person].is_some() {
            continue;
        }
        let mut group = vec![person];
        group.extend(
            topology.spouses[person]
                .iter()
                .copied()
                .filter(|&s| group_of[s].is_none() && generation[s] == generation[person]),
        );
        let gi = groups.len();
        for &member in &group {
            group_of[member] = Some(gi);
        }
        groups.push(group);
    }

    groups
}
