//! Output for parsed reasoning: colored terminal text, JSON and SVG.

pub mod svg;
pub mod text;

use serde::Serialize;

use crate::error::Result;
use crate::timeline::TimelinePoint;
use crate::tree::ThoughtNode;

pub use svg::{render_timeline_svg, SvgLayout};
pub use text::{render_timeline, render_tree};

/// Both structures for one piece of text, as served by `/api/parse` and
/// printed by `--format json`.
#[derive(Debug, Serialize)]
pub struct ParsedReasoning<'a> {
    pub timeline: &'a [TimelinePoint],
    pub tree: Option<&'a ThoughtNode>,
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
