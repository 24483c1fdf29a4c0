#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, LayoutOptions, load_config};
pub use ir::{Pedigree, PedigreeDocument, PedigreeError, Person, Relationship, Sex};
pub use layout::{Layout, LayoutNode, PedigreeLayouter, compute_layout};
