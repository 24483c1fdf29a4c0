use std::collections::BTreeMap;

use crate::ir::{PersonId, Sex};

/// Placement of one person. `x`/`y` is the centre of the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: PersonId,
    pub sex: Sex,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub generation: usize,
    /// Left-to-right index within the generation.
    pub order: usize,
}

impl LayoutNode {
    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn of<'a>(nodes: impl IntoIterator<Item = &'a LayoutNode>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for node in nodes {
            let b = bounds.get_or_insert(Self {
                min_x: f32::MAX,
                min_y: f32::MAX,
                max_x: f32::MIN,
                max_y: f32::MIN,
            });
            b.min_x = b.min_x.min(node.left());
            b.min_y = b.min_y.min(node.top());
            b.max_x = b.max_x.max(node.right());
            b.max_y = b.max_y.max(node.bottom());
        }
        bounds
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub nodes: BTreeMap<PersonId, LayoutNode>,
    /// Person ids per generation, left to right.
    pub generations: Vec<Vec<PersonId>>,
    pub bounds: Bounds,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    pub fn width(&self) -> f32 {
        self.bounds.width()
    }

    pub fn height(&self) -> f32 {
        self.bounds.height()
    }

    /// Manual drag: moves one node without re-running the engine. Returns
    /// false for unknown ids.
    pub fn relocate(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.x = x;
        node.y = y;
        self.bounds = Bounds::of(self.nodes.values()).unwrap_or_default();
        true
    }
}
