pub mod animation;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod hit;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod link;
pub mod parser;
pub mod render;
pub mod session;
pub mod state;
pub mod text_metrics;
pub mod theme;
pub mod tween;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use error::LoadError;
pub use ir::{NodeId, ROOT, Tree};
pub use parser::parse_tree;
pub use render::{render_snapshot, render_svg};
pub use session::{Frame, Intent, Sunburst};
