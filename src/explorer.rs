//! # Stage: Explorer
//!
//! ## Responsibility
//! Hold the view state for one piece of reasoning text: debounce content
//! changes, parse once per distinct content, keep the resulting timeline and
//! tree, and track tree expansion and timeline selection.
//!
//! ## Guarantees
//! - Memoized: identical content is never parsed twice in a row
//! - Debounced: parsing waits until `debounce_ms` has passed since the last change
//! - No partial results: a failed parse clears that structure, logs the
//!   error and keeps it for [`Explorer::take_error`]
//! - Clock-free: callers pass `now_ms`, so tests control time
//!
//! ## NOT Responsible For
//! - Rendering (see [`crate::render`])
//! - Persistence

use std::collections::HashSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::LensConfig;
use crate::error::LensError;
use crate::timeline::{TimelineParser, TimelinePoint};
use crate::tree::{ThoughtNode, TreeParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Flat timeline with straight edges.
    #[default]
    Timeline,
    /// Perspective graph with curved edges.
    Graph,
    /// Collapsible thought tree.
    Tree,
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::Timeline => write!(f, "timeline"),
            ViewMode::Graph => write!(f, "graph"),
            ViewMode::Tree => write!(f, "tree"),
        }
    }
}

struct Pending {
    content: String,
    changed_ms: u64,
}

pub struct Explorer {
    timeline_parser: TimelineParser,
    tree_parser: TreeParser,
    debounce_ms: u64,
    mode: ViewMode,
    pending: Option<Pending>,
    parsed_content: Option<String>,
    timeline: Option<Vec<TimelinePoint>>,
    tree: Option<ThoughtNode>,
    expanded: HashSet<String>,
    expansion_initialised: bool,
    selected: Option<String>,
    last_error: Option<LensError>,
}

impl Explorer {
    pub fn new(config: &LensConfig) -> Self {
        Explorer {
            timeline_parser: TimelineParser::new(config.timeline.clone())
                .with_input_limit(config.limits.max_input_bytes),
            tree_parser: TreeParser::new(config.tree.clone())
                .with_input_limit(config.limits.max_input_bytes),
            debounce_ms: config.explorer.debounce_ms,
            mode: ViewMode::default(),
            pending: None,
            parsed_content: None,
            timeline: None,
            tree: None,
            expanded: HashSet::new(),
            expansion_initialised: false,
            selected: None,
            last_error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Content and parsing
    // -----------------------------------------------------------------------

    /// Record new content. Parsing happens on a later [`Explorer::poll`].
    pub fn set_content(&mut self, content: impl Into<String>, now_ms: u64) {
        self.pending = Some(Pending { content: content.into(), changed_ms: now_ms });
    }

    /// Parse the pending content if the debounce window has elapsed.
    /// Returns whether a parse ran.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|p| now_ms.saturating_sub(p.changed_ms) >= self.debounce_ms);
        if due {
            self.flush()
        } else {
            false
        }
    }

    /// Parse the pending content immediately. Returns whether a parse ran.
    pub fn flush(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if self.parsed_content.as_deref() == Some(pending.content.as_str()) {
            debug!("content unchanged, reusing parse");
            return false;
        }
        self.parse(&pending.content);
        self.parsed_content = Some(pending.content);
        true
    }

    fn parse(&mut self, content: &str) {
        self.last_error = None;
        self.timeline = match self.timeline_parser.parse(content) {
            Ok(points) => Some(points),
            Err(e) => {
                error!(error = %e, "timeline parse failed");
                self.last_error = Some(e);
                None
            }
        };
        self.tree = match self.tree_parser.parse(content) {
            Ok(root) => Some(root),
            Err(e) => {
                error!(error = %e, "thought tree parse failed");
                self.last_error.get_or_insert(e);
                None
            }
        };

        if let Some(root) = &self.tree {
            if !self.expansion_initialised {
                self.expanded.insert(root.id.clone());
                self.expanded.extend(root.children.iter().map(|c| c.id.clone()));
                self.expansion_initialised = true;
            }
        }

        let selection_gone = self
            .selected
            .as_deref()
            .is_some_and(|id| self.point(id).is_none());
        if selection_gone {
            self.selected = None;
        }
    }

    /// The error from the most recent parse, if it failed. Cleared by the
    /// next parse or by taking it.
    pub fn take_error(&mut self) -> Option<LensError> {
        self.last_error.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn timeline(&self) -> Option<&[TimelinePoint]> {
        self.timeline.as_deref()
    }

    pub fn tree(&self) -> Option<&ThoughtNode> {
        self.tree.as_ref()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    // -----------------------------------------------------------------------
    // Tree expansion
    // -----------------------------------------------------------------------

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded(&self) -> &HashSet<String> {
        &self.expanded
    }

    /// Flip a node between expanded and collapsed. Returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    pub fn expand_all(&mut self) {
        if let Some(root) = &self.tree {
            self.expanded = root.descendants().into_iter().map(|n| n.id.clone()).collect();
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    // -----------------------------------------------------------------------
    // Timeline selection
    // -----------------------------------------------------------------------

    pub fn point(&self, id: &str) -> Option<&TimelinePoint> {
        self.timeline.as_ref()?.iter().find(|p| p.id == id)
    }

    /// Select a point by id. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.point(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&TimelinePoint> {
        self.selected.as_deref().and_then(|id| self.point(id))
    }

    /// Ids linked to `id` in either direction, in timeline order.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(points) = self.timeline.as_ref() else {
            return Vec::new();
        };
        let Some(origin) = points.iter().find(|p| p.id == id) else {
            return Vec::new();
        };
        points
            .iter()
            .filter(|p| p.id != id && (origin.is_connected_to(&p.id) || p.is_connected_to(id)))
            .map(|p| p.id.as_str())
            .collect()
    }
}

impl Default for Explorer {
    fn default() -> Self {
        Explorer::new(&LensConfig::default())
    }
}
