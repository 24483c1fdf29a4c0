use crate::ir::Sex;
use crate::layout::{Bounds, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub bounds: BoundsDump,
    pub generations: Vec<Vec<String>>,
    pub nodes: Vec<NodeDump>,
}

#[derive(Debug, Serialize)]
pub struct BoundsDump {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub sex: Sex,
    pub x: f32,
    pub y: f32,
    pub generation: usize,
    pub order: usize,
}

impl From<Bounds> for BoundsDump {
    fn from(bounds: Bounds) -> Self {
        Self {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            max_x: bounds.max_x,
            max_y: bounds.max_y,
        }
    }
}

impl LayoutDump {
    /// Nodes are listed generation by generation, left to right.
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .generations
            .iter()
            .flatten()
            .filter_map(|id| layout.node(id))
            .map(|node| NodeDump {
                id: node.id.clone(),
                sex: node.sex,
                x: node.x,
                y: node.y,
                generation: node.generation,
                order: node.order,
            })
            .collect();

        LayoutDump {
            width: layout.width(),
            height: layout.height(),
            bounds: layout.bounds.into(),
            generations: layout.generations.clone(),
            nodes,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
