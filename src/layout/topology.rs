use std::collections::{BTreeSet, HashMap};

use crate::ir::{Pedigree, Sex};

/// Index-based, read-only view of the pedigree links. Indices follow person
/// insertion order. Unresolvable ids are dropped while building, and
/// parent-to-child edges are cut down to a DAG.
#[derive(Debug, Clone)]
pub(super) struct Topology<'a> {
    pub ids: Vec<&'a str>,
    pub sex: Vec<Sex>,
    index: HashMap<&'a str, usize>,
    pub children: Vec<Vec<usize>>,
    pub parents: Vec<Vec<usize>>,
    /// Sorted by index.
    pub spouses: Vec<Vec<usize>>,
    pub cut_edges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

impl<'a> Topology<'a> {
    pub fn build(pedigree: &'a Pedigree) -> Self {
        let persons: Vec<_> = pedigree.persons_in_order().collect();
        let ids: Vec<&str> = persons.iter().map(|p| p.id.as_str()).collect();
        let sex: Vec<Sex> = persons.iter().map(|p| p.sex).collect();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let n = ids.len();

        let resolve = |id: &str, context: &str| -> Option<usize> {
            let found = index.get(id).copied();
            if found.is_none() {
                tracing::debug!(id, context, "skipping reference to unknown person");
            }
            found
        };

        let mut spouse_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut self_links = 0usize;

        for (idx, person) in persons.iter().enumerate() {
            for spouse in &person.spouses {
                if let Some(s) = resolve(spouse, "spouse") {
                    link_spouses(idx, s, &mut spouse_sets);
                }
            }
            for child in &person.children {
                if let Some(c) = resolve(child, "child") {
                    if c == idx {
                        self_links += 1;
                    } else {
                        push_unique(&mut children[idx], c);
                    }
                }
            }
            for parent in [&person.father, &person.mother].into_iter().flatten() {
                if let Some(p) = resolve(parent, "parent") {
                    if p == idx {
                        self_links += 1;
                    } else {
                        push_unique(&mut children[p], idx);
                    }
                }
            }
        }

        for rel in &pedigree.relationships {
            let a = resolve(&rel.person1, "partner");
            let b = resolve(&rel.person2, "partner");
            if let (Some(a), Some(b)) = (a, b) {
                link_spouses(a, b, &mut spouse_sets);
            }
            for child in &rel.children {
                let Some(c) = resolve(child, "child") else {
                    continue;
                };
                for parent in [a, b].into_iter().flatten() {
                    if parent == c {
                        self_links += 1;
                    } else {
                        push_unique(&mut children[parent], c);
                    }
                }
            }
        }

        let cut_edges = self_links + cut_back_edges(&mut children);
        if cut_edges > 0 {
            tracing::warn!(cut_edges, "pedigree has circular parent links; ignoring back edges");
        }

        let mut parents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (parent, kids) in children.iter().enumerate() {
            for &child in kids {
                parents[child].push(parent);
            }
        }

        Self {
            ids,
            sex,
            index,
            children,
            parents,
            spouses: spouse_sets
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
            cut_edges,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn are_spouses(&self, a: usize, b: usize) -> bool {
        self.spouses[a].binary_search(&b).is_ok()
    }

    pub fn share_parent(&self, a: usize, b: usize) -> bool {
        self.parents[a].iter().any(|p| self.parents[b].contains(p))
    }

    pub fn is_child_of(&self, child: usize, parent: usize) -> bool {
        self.parents[child].contains(&parent)
    }
}

fn link_spouses(a: usize, b: usize, sets: &mut [BTreeSet<usize>]) {
    if a != b {
        sets[a].insert(b);
        sets[b].insert(a);
    }
}

fn push_unique(list: &mut Vec<usize>, value: usize) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Iterative depth-first search in index order; every edge that closes a
/// cycle is removed. Returns the number of removed edges.
fn cut_back_edges(children: &mut [Vec<usize>]) -> usize {
    let n = children.len();
    let mut state = vec![Visit::New; n];
    let mut back_edges: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            if cursor < children[node].len() {
                frame.1 += 1;
                let child = children[node][cursor];
                match state[child] {
                    Visit::New => {
                        state[child] = Visit::Active;
                        stack.push((child, 0));
                    }
                    Visit::Active => back_edges.push((node, child)),
                    Visit::Done => {}
                }
            } else {
                state[node] = Visit::Done;
                stack.pop();
            }
        }
    }

    for (parent, child) in &back_edges {
        children[*parent].retain(|c| c != child);
    }
    back_edges.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Person, Relationship};

    #[test]
    fn merges_links_from_every_source() {
        let mut pedigree = Pedigree::new();
        pedigree.ensure_person("A", Sex::Male);
        pedigree.ensure_person("B", Sex::Female);
        let mut child = Person::new("C", Sex::Male);
        child.father = Some("A".to_string());
        child.mother = Some("ghost".to_string());
        pedigree.add_person(child).unwrap();
        pedigree.ensure_person("D", Sex::Female);
        pedigree
            .relationships
            .push(Relationship::new("r", "A", "B").with_children(["D", "missing"]));

        let topo = Topology::build(&pedigree);
        let a = topo.index_of("A").unwrap();
        let b = topo.index_of("B").unwrap();
        let c = topo.index_of("C").unwrap();
        let d = topo.index_of("D").unwrap();
        assert!(topo.are_spouses(a, b));
        assert_eq!(topo.children[a], vec![c, d]);
        assert_eq!(topo.children[b], vec![d]);
        assert!(topo.share_parent(c, d));
        assert_eq!(topo.parents[c], vec![a]);
        assert_eq!(topo.cut_edges, 0);
    }

    #[test]
    fn cuts_parent_cycles() {
        let mut pedigree = Pedigree::new();
        for id in ["A", "B", "C"] {
            pedigree.ensure_person(id, Sex::Unknown);
        }
        pedigree.update_person("B", |p| p.father = Some("A".into())).unwrap();
        pedigree.update_person("C", |p| p.father = Some("B".into())).unwrap();
        pedigree.update_person("A", |p| p.father = Some("C".into())).unwrap();

        let topo = Topology::build(&pedigree);
        assert_eq!(topo.cut_edges, 1);
        let edges: usize = topo.children.iter().map(Vec::len).sum();
        assert_eq!(edges, 2);
    }

    #[test]
    fn drops_self_parent_links() {
        let mut pedigree = Pedigree::new();
        pedigree.ensure_person("A", Sex::Male);
        pedigree.update_person("A", |p| p.father = Some("A".into())).unwrap();
        let topo = Topology::build(&pedigree);
        assert_eq!(topo.cut_edges, 1);
        assert!(topo.children[0].is_empty());
        assert!(topo.parents[0].is_empty());
    }
}
