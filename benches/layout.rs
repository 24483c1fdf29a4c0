use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pedigree_layout::config::LayoutConfig;
use pedigree_layout::ir::{Pedigree, Person, Relationship, Sex};
use pedigree_layout::layout::compute_layout;
use pedigree_layout::render::render_svg;
use pedigree_layout::theme::Theme;
use std::hint::black_box;

/// Founder couples at the top; every couple has `children` children, and
/// each child marries an unrelated partner, for `depth` generations.
fn branching_pedigree(founders: usize, children: usize, depth: usize) -> Pedigree {
    let mut pedigree = Pedigree::new();
    let mut next_id = 0usize;
    let mut fresh = |pedigree: &mut Pedigree, sex: Sex| {
        let id = format!("p{next_id}");
        next_id += 1;
        pedigree
            .add_person(Person::new(id.clone(), sex))
            .expect("fresh id");
        id
    };

    let mut couples: Vec<(String, String)> = (0..founders)
        .map(|_| (fresh(&mut pedigree, Sex::Male), fresh(&mut pedigree, Sex::Female)))
        .collect();
    let mut rel_id = 0usize;
    for _ in 0..depth {
        let mut next = Vec::new();
        for (a, b) in &couples {
            let kids: Vec<String> = (0..children)
                .map(|i| {
                    let sex = if i % 2 == 0 { Sex::Male } else { Sex::Female };
                    fresh(&mut pedigree, sex)
                })
                .collect();
            pedigree
                .add_relationship(
                    Relationship::new(format!("r{rel_id}"), a.as_str(), b.as_str())
                        .with_children(kids.iter().cloned()),
                )
                .expect("valid relationship");
            rel_id += 1;
            for kid in kids {
                let partner = fresh(&mut pedigree, Sex::Unknown);
                next.push((kid, partner));
            }
        }
        couples = next;
    }
    for (a, b) in couples {
        pedigree
            .add_relationship(Relationship::new(format!("r{rel_id}"), a, b))
            .expect("valid relationship");
        rel_id += 1;
    }
    pedigree
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for (founders, children, depth) in [(1usize, 2usize, 2usize), (2, 3, 3), (4, 2, 4)] {
        let name = format!("branching_{founders}_{children}_{depth}");
        let pedigree = branching_pedigree(founders, children, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &pedigree, |b, pedigree| {
            b.iter(|| {
                let layout = compute_layout(black_box(pedigree), &config);
                black_box(layout.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let theme = Theme::classic();
    let config = LayoutConfig::default();
    let pedigree = branching_pedigree(2, 3, 3);
    let layout = compute_layout(&pedigree, &config);
    group.bench_function("branching_2_3_3", |b| {
        b.iter(|| {
            let svg = render_svg(black_box(&layout), &pedigree, &theme);
            black_box(svg.len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_layout, bench_render);
criterion_main!(benches);
