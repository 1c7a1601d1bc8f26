//! Turn a language model's free-form reasoning text into navigable
//! structures: an ordered timeline of classified, scored points with
//! directed links, and a tree of thoughts grouped under section headings.
//!
//! ```
//! use thought_lens::{ThoughtKind, TimelineParser};
//!
//! let points = TimelineParser::default()
//!     .parse("# Premise\nCats are mammals.\n\n# Conclusion\nTherefore cats need protein-rich diets.")
//!     .unwrap();
//! assert_eq!(points[1].kind, ThoughtKind::Conclusion);
//! assert_eq!(points[1].connections, vec!["point-0"]);
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod explorer;
pub mod markdown;
pub mod render;
pub mod scoring;
pub mod timeline;
pub mod tree;
pub mod voice;
pub mod web;

pub use classify::ThoughtKind;
pub use config::LensConfig;
pub use error::{LensError, Result};
pub use explorer::{Explorer, ViewMode};
pub use timeline::{TimelineParser, TimelinePoint};
pub use tree::{ThoughtNode, TreeParser};
