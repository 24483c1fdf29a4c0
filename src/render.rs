use crate::ir::{Pedigree, Sex};
use crate::layout::{Layout, LayoutNode};
use crate::theme::Theme;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[cfg(feature = "png")]
use crate::config::RenderConfig;

const PADDING: f32 = 24.0;
const LABEL_GAP: f32 = 4.0;
const DOUBLE_LINE_OFFSET: f32 = 2.5;
const SLASH_SIZE: f32 = 6.0;

/// Preview of a laid out pedigree. Persons missing from the layout are not
/// drawn, and neither is any line touching them.
pub fn render_svg(layout: &Layout, pedigree: &Pedigree, theme: &Theme) -> String {
    let mut svg = String::new();
    let label_room = theme.font_size + LABEL_GAP;
    let min_x = layout.bounds.min_x - PADDING;
    let min_y = layout.bounds.min_y - PADDING;
    let width = (layout.width() + 2.0 * PADDING).max(200.0);
    let height = (layout.height() + 2.0 * PADDING + label_room).max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{min_x:.2} {min_y:.2} {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{min_x:.2}\" y=\"{min_y:.2}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    let stroke = format!(
        "fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"",
        theme.line_color, theme.line_width
    );

    for (a, b, rel) in partner_pairs(layout, pedigree) {
        let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
        let (x1, x2) = (left.right(), right.left());
        let y = (left.y + right.y) / 2.0;
        let consanguineous = rel.is_some_and(|(consanguineous, _)| consanguineous);
        let divorced = rel.is_some_and(|(_, divorced)| divorced);
        if consanguineous {
            for dy in [-DOUBLE_LINE_OFFSET, DOUBLE_LINE_OFFSET] {
                svg.push_str(&line(x1, y + dy, x2, y + dy, &stroke));
            }
        } else {
            svg.push_str(&line(x1, y, x2, y, &stroke));
        }
        if divorced {
            let mid = (x1 + x2) / 2.0;
            for dx in [-SLASH_SIZE / 2.0, SLASH_SIZE / 2.0] {
                svg.push_str(&line(
                    mid + dx - SLASH_SIZE / 2.0,
                    y + SLASH_SIZE,
                    mid + dx + SLASH_SIZE / 2.0,
                    y - SLASH_SIZE,
                    &stroke,
                ));
            }
        }
    }

    for (parents, children) in sibships(layout, pedigree) {
        svg.push_str(&descent_lines(&parents, &children, &stroke));
    }

    for person in pedigree.persons_in_order() {
        let Some(node) = layout.node(&person.id) else {
            continue;
        };
        svg.push_str(&symbol_svg(node, theme));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            node.x,
            node.bottom() + label_room,
            theme.font_family,
            theme.font_size,
            theme.text_color,
            escape_xml(person.display_label())
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn line(x1: f32, y1: f32, x2: f32, y2: f32, stroke: &str) -> String {
    format!("<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" {stroke}/>")
}

fn symbol_svg(node: &LayoutNode, theme: &Theme) -> String {
    let paint = format!(
        "fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"",
        theme.symbol_fill, theme.symbol_stroke, theme.symbol_stroke_width
    );
    match node.sex {
        Sex::Male => format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" {paint}/>",
            node.left(),
            node.top(),
            node.width,
            node.height
        ),
        Sex::Female => format!(
            "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" {paint}/>",
            node.x,
            node.y,
            node.width / 2.0,
            node.height / 2.0
        ),
        Sex::Unknown => format!(
            "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" {paint}/>",
            node.x,
            node.top(),
            node.right(),
            node.y,
            node.x,
            node.bottom(),
            node.left(),
            node.y
        ),
    }
}

/// Partner pairs present in the layout, with the relationship flags
/// (consanguineous, divorced) when a relationship record backs the pair.
fn partner_pairs<'a>(
    layout: &'a Layout,
    pedigree: &Pedigree,
) -> Vec<(&'a LayoutNode, &'a LayoutNode, Option<(bool, bool)>)> {
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut pairs = Vec::new();
    let mut push = |a: &str, b: &str, flags: Option<(bool, bool)>| {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        if a == b || seen.contains(&key) {
            return;
        }
        if let (Some(na), Some(nb)) = (layout.node(a), layout.node(b)) {
            seen.insert(key);
            pairs.push((na, nb, flags));
        }
    };
    for rel in &pedigree.relationships {
        push(
            &rel.person1,
            &rel.person2,
            Some((rel.consanguineous, rel.divorced)),
        );
    }
    for person in pedigree.persons_in_order() {
        for spouse in &person.spouses {
            push(&person.id, spouse, None);
        }
    }
    pairs
}

/// Children grouped by their (father, mother) pair, restricted to parents
/// present in the layout.
fn sibships<'a>(
    layout: &'a Layout,
    pedigree: &Pedigree,
) -> Vec<(Vec<&'a LayoutNode>, Vec<&'a LayoutNode>)> {
    let mut groups: BTreeMap<(Option<&'a str>, Option<&'a str>), Vec<&'a LayoutNode>> =
        BTreeMap::new();
    let mut keys = Vec::new();
    for person in pedigree.persons_in_order() {
        let Some(child) = layout.node(&person.id) else {
            continue;
        };
        let parent = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| layout.nodes.get_key_value(id))
                .map(|(key, _)| key.as_str())
        };
        let key = (parent(&person.father), parent(&person.mother));
        if key == (None, None) {
            continue;
        }
        let entry = groups.entry(key).or_default();
        if entry.is_empty() {
            keys.push(key);
        }
        entry.push(child);
    }
    keys.into_iter()
        .filter_map(|key| {
            let children = groups.remove(&key)?;
            let parents = [key.0, key.1]
                .into_iter()
                .flatten()
                .filter_map(|id| layout.node(id))
                .collect();
            Some((parents, children))
        })
        .collect()
}

fn descent_lines(parents: &[&LayoutNode], children: &[&LayoutNode], stroke: &str) -> String {
    let mut out = String::new();
    let Some(top_of_children) = children.iter().map(|c| c.top()).reduce(f32::min) else {
        return out;
    };
    let (anchor_x, anchor_y, parent_bottom) = match parents {
        [single] => (single.x, single.bottom(), single.bottom()),
        [a, b, ..] => (
            (a.x + b.x) / 2.0,
            (a.y + b.y) / 2.0,
            a.bottom().max(b.bottom()),
        ),
        [] => return out,
    };
    let bar_y = (parent_bottom + top_of_children) / 2.0;
    out.push_str(&line(anchor_x, anchor_y, anchor_x, bar_y, stroke));

    let min_x = children.iter().map(|c| c.x).fold(anchor_x, f32::min);
    let max_x = children.iter().map(|c| c.x).fold(anchor_x, f32::max);
    if max_x > min_x {
        out.push_str(&line(min_x, bar_y, max_x, bar_y, stroke));
    }
    for child in children {
        out.push_str(&line(child.x, bar_y, child.x, child.top(), stroke));
    }
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
