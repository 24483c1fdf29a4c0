use std::collections::BTreeMap;
use std::path::Path;

use pedigree_layout::render::render_svg;
use pedigree_layout::theme::Theme;
use pedigree_layout::{
    Layout, LayoutConfig, LayoutOptions, Pedigree, PedigreeDocument, PedigreeLayouter, Person,
    Relationship, Sex, compute_layout,
};

const TOLERANCE: f32 = 1e-3;

fn load_fixture(name: &str) -> Pedigree {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    let document: PedigreeDocument = serde_json::from_str(&input).expect("fixture parse failed");
    Pedigree::from_document(document)
}

fn are_spouses(pedigree: &Pedigree, a: &str, b: &str) -> bool {
    pedigree.relationships.iter().any(|rel| rel.joins(a, b))
        || [(a, b), (b, a)].iter().any(|(x, y)| {
            pedigree
                .person(x)
                .is_some_and(|p| p.spouses.iter().any(|s| s == y))
        })
}

fn share_parent(pedigree: &Pedigree, a: &str, b: &str) -> bool {
    let (Some(a), Some(b)) = (pedigree.person(a), pedigree.person(b)) else {
        return false;
    };
    [&a.father, &a.mother]
        .into_iter()
        .flatten()
        .any(|parent| b.father.as_ref() == Some(parent) || b.mother.as_ref() == Some(parent))
}

/// Every adjacent pair in every generation respects its minimum gap.
fn assert_no_collisions(layout: &Layout, pedigree: &Pedigree, config: &LayoutConfig, name: &str) {
    for (level, row) in layout.generations.iter().enumerate() {
        let mut nodes: Vec<_> = row.iter().filter_map(|id| layout.node(id)).collect();
        nodes.sort_by(|a, b| a.x.total_cmp(&b.x));
        for pair in nodes.windows(2) {
            let gap = if are_spouses(pedigree, &pair[0].id, &pair[1].id) {
                config.spouse_spacing
            } else if share_parent(pedigree, &pair[0].id, &pair[1].id) {
                config.sibling_spacing
            } else {
                config.horizontal_spacing
            };
            let distance = pair[1].x - pair[0].x;
            assert!(
                distance >= config.node_width + gap - TOLERANCE,
                "{name}: {} and {} in generation {level} are {distance} apart",
                pair[0].id,
                pair[1].id
            );
        }
    }
}

fn assert_generation_constraints(layout: &Layout, pedigree: &Pedigree, name: &str) {
    let generation = |id: &str| layout.node(id).map(|node| node.generation);
    for person in pedigree.persons_in_order() {
        let Some(own) = generation(&person.id) else {
            continue;
        };
        for parent in [&person.father, &person.mother].into_iter().flatten() {
            if let Some(parent_generation) = generation(parent) {
                assert!(
                    own > parent_generation,
                    "{name}: {} is not below its parent {parent}",
                    person.id
                );
            }
        }
        for spouse in &person.spouses {
            if let Some(spouse_generation) = generation(spouse) {
                assert_eq!(own, spouse_generation, "{name}: {} and {spouse}", person.id);
            }
        }
    }
    for rel in &pedigree.relationships {
        if let (Some(a), Some(b)) = (generation(&rel.person1), generation(&rel.person2)) {
            assert_eq!(a, b, "{name}: relationship {}", rel.id);
        }
    }
}

fn assert_centered(layout: &Layout, config: &LayoutConfig) {
    assert!(layout.bounds.center_x().abs() < TOLERANCE);
    assert!((layout.bounds.min_y - config.top_margin).abs() < TOLERANCE);
}

#[test]
fn layout_all_fixtures() {
    let config = LayoutConfig::default();
    // Keep this list explicit so new fixtures must be added intentionally.
    let acyclic = [
        "couple.json",
        "nuclear.json",
        "half_siblings.json",
        "consanguinity.json",
    ];
    for name in acyclic {
        let pedigree = load_fixture(name);
        let layout = compute_layout(&pedigree, &config);
        assert_eq!(layout.nodes.len(), pedigree.len(), "{name}");
        assert_generation_constraints(&layout, &pedigree, name);
        assert_no_collisions(&layout, &pedigree, &config, name);
        assert_centered(&layout, &config);

        let svg = render_svg(&layout, &pedigree, &Theme::classic());
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{name}: missing </svg tag");
    }
}

#[test]
fn married_couple_without_children() {
    let pedigree = load_fixture("couple.json");
    let layout = compute_layout(&pedigree, &LayoutConfig::default());
    let a = layout.node("A").unwrap();
    let b = layout.node("B").unwrap();
    assert_eq!((a.generation, b.generation), (0, 0));
    assert_eq!(a.y, b.y);
    assert!((b.x - a.x - 110.0).abs() < TOLERANCE);
}

#[test]
fn children_centered_under_parents() {
    let pedigree = load_fixture("nuclear.json");
    let config = LayoutConfig::default();
    let layout = compute_layout(&pedigree, &config);
    let node = |id: &str| layout.node(id).unwrap();
    assert_eq!(node("C").generation, 1);
    assert_eq!(node("D").generation, 1);
    let parents_mid = (node("A").x + node("B").x) / 2.0;
    let children_mid = (node("C").x + node("D").x) / 2.0;
    assert!((parents_mid - children_mid).abs() <= config.safe_offset_step);
    assert!(node("C").y > node("A").y);
    assert_eq!(node("A").y, node("B").y);
}

#[test]
fn shared_partner_between_both_spouses() {
    let pedigree = load_fixture("half_siblings.json");
    let config = LayoutConfig::default();
    let layout = compute_layout(&pedigree, &config);
    assert_eq!(layout.generations[0], vec!["F", "E", "G"]);
    let occurrences = layout.generations.iter().flatten().filter(|id| *id == "E").count();
    assert_eq!(occurrences, 1);
    let order = |id: &str| layout.node(id).unwrap().order;
    assert_eq!(order("E"), order("F") + 1);
    assert_eq!(order("G"), order("E") + 1);
    assert_no_collisions(&layout, &pedigree, &config, "half_siblings");

    let x = |id: &str| layout.node(id).unwrap().x;
    let first_children = (x("C1") + x("C2")) / 2.0;
    assert!((first_children - (x("F") + x("E")) / 2.0).abs() <= config.safe_offset_step);
    assert!((x("C3") - (x("E") + x("G")) / 2.0).abs() <= config.safe_offset_step);
}

fn narrowing_pedigree(reverse: bool) -> Pedigree {
    let founders: Vec<String> = (0..8).map(|i| format!("f{i}")).collect();
    let middle: Vec<String> = (0..4).map(|i| format!("c{i}")).collect();
    let grand: Vec<String> = (0..2).map(|i| format!("g{i}")).collect();
    let proband = "d".to_string();
    let mut ids: Vec<&String> = founders
        .iter()
        .chain(&middle)
        .chain(&grand)
        .chain([&proband])
        .collect();
    if reverse {
        ids.reverse();
    }

    let mut pedigree = Pedigree::new();
    for (idx, id) in ids.iter().enumerate() {
        let sex = if id.as_str() == "d" {
            Sex::Unknown
        } else if id[1..].parse::<usize>().unwrap_or(idx) % 2 == 0 {
            Sex::Male
        } else {
            Sex::Female
        };
        pedigree.add_person(Person::new(id.as_str(), sex)).unwrap();
    }
    let mut couple = |id: String, a: &str, b: &str, child: &str| {
        pedigree
            .add_relationship(Relationship::new(id, a, b).with_children([child]))
            .unwrap();
    };
    for i in 0..4 {
        couple(
            format!("r0{i}"),
            &founders[2 * i],
            &founders[2 * i + 1],
            &middle[i],
        );
    }
    for i in 0..2 {
        couple(format!("r1{i}"), &middle[2 * i], &middle[2 * i + 1], &grand[i]);
    }
    couple("r2".to_string(), &grand[0], &grand[1], &proband);
    pedigree
}

#[test]
fn four_generations_narrowing_to_one() {
    let pedigree = narrowing_pedigree(false);
    let config = LayoutConfig::default();
    let layout = compute_layout(&pedigree, &config);
    let sizes: Vec<usize> = layout.generations.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![8, 4, 2, 1]);
    assert_eq!(layout.node("d").unwrap().generation, 3);
    assert_no_collisions(&layout, &pedigree, &config, "narrowing");
    assert_generation_constraints(&layout, &pedigree, "narrowing");
    assert_centered(&layout, &config);
}

#[test]
fn generations_ignore_insertion_order() {
    let config = LayoutConfig::default();
    let forward = compute_layout(&narrowing_pedigree(false), &config);
    let backward = compute_layout(&narrowing_pedigree(true), &config);
    let generations = |layout: &Layout| -> BTreeMap<String, usize> {
        layout
            .nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.generation))
            .collect()
    };
    assert_eq!(generations(&forward), generations(&backward));
}

#[test]
fn corrupt_parent_cycles_terminate() {
    let pedigree = load_fixture("corrupt_cycle.json");
    let config = LayoutConfig::default();
    let layout = compute_layout(&pedigree, &config);
    assert_eq!(layout.nodes.len(), 4);
    for node in layout.nodes.values() {
        assert!(node.x.is_finite() && node.y.is_finite(), "{}", node.id);
        assert!(node.generation < layout.generations.len());
    }
    assert_no_collisions(&layout, &pedigree, &config, "corrupt_cycle");
}

#[test]
fn layout_is_idempotent() {
    let pedigree = load_fixture("consanguinity.json");
    let layouter = PedigreeLayouter::default();
    let first = layouter.layout(&pedigree);
    let second = layouter.layout(&pedigree);
    assert_eq!(first, second);
}

#[test]
fn dangling_references_are_skipped() {
    let document: PedigreeDocument = serde_json::from_str(
        r#"{
            "persons": [
                { "id": "kid", "father": "ghost", "mother": "mum" },
                { "id": "mum", "sex": "female", "spouses": ["nobody"] }
            ],
            "relationships": [
                { "id": "r", "person1": "mum", "person2": "ghost", "children": ["kid", "other"] }
            ]
        }"#,
    )
    .unwrap();
    let pedigree = Pedigree::from_document(document);
    let layout = compute_layout(&pedigree, &LayoutConfig::default());
    assert_eq!(layout.nodes.len(), 2);
    assert_eq!(layout.node("mum").unwrap().generation, 0);
    assert_eq!(layout.node("kid").unwrap().generation, 1);
    assert!(layout.node("ghost").is_none());
}

#[test]
fn removing_a_person_drops_it_from_the_layout() {
    let mut pedigree = load_fixture("nuclear.json");
    pedigree.remove_person("B").unwrap();
    assert!(pedigree.person("C").unwrap().mother.is_none());
    assert!(pedigree.relationship("r1").is_none());
    let layout = compute_layout(&pedigree, &LayoutConfig::default());
    assert!(layout.node("B").is_none());
    assert_eq!(layout.node("C").unwrap().generation, 1);
}

#[test]
fn placements_written_back_on_request() {
    let mut pedigree = load_fixture("nuclear.json");
    let layout = compute_layout(&pedigree, &LayoutConfig::default());
    assert!(pedigree.person("A").unwrap().placement.is_none());
    pedigree.apply_layout(&layout);
    let placement = pedigree.person("D").unwrap().placement.unwrap();
    let node = layout.node("D").unwrap();
    assert_eq!(placement.generation, node.generation);
    assert_eq!((placement.x, placement.y), (node.x, node.y));
}

#[test]
fn options_update_between_passes() {
    let pedigree = load_fixture("couple.json");
    let mut layouter = PedigreeLayouter::default();
    let before = layouter.layout(&pedigree);
    layouter.set_options(&LayoutOptions {
        spouse_spacing: Some(90.0),
        vertical_spacing: Some(-1.0),
        ..Default::default()
    });
    let after = layouter.layout(&pedigree);
    let spread = |layout: &Layout| layout.node("B").unwrap().x - layout.node("A").unwrap().x;
    assert!((spread(&before) - 110.0).abs() < TOLERANCE);
    assert!((spread(&after) - 140.0).abs() < TOLERANCE);
    assert_eq!(layouter.options().vertical_spacing, 100.0);
}
