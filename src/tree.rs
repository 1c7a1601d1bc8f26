//! # Thought tree parser
//!
//! Builds a rooted hierarchy from reasoning text. Markdown headings (`#` to
//! `###`) open sections and their paragraphs become leaves. Text without
//! headings is segmented heuristically: short paragraphs and paragraphs that
//! open with a discourse or step marker start new sections, everything else
//! attaches to the most recent section.
//!
//! The tree is built in one linear pass and is acyclic by construction.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{
    classify, starts_with_discourse_marker, starts_with_step_marker, Subject, ThoughtKind,
    INFERRED_SECTION_RULES, LEAF_RULES, MARKED_SECTION_RULES,
};
use crate::config::TreeConfig;
use crate::error::{LensError, Result};
use crate::markdown::{
    split_paragraphs, strip_emphasis, strip_heading_markers, strip_list_markers,
    summarize_code_blocks,
};

pub const ROOT_ID: &str = "root";
pub const ROOT_CONTENT: &str = "Thought Process";

/// Starts a section marker; followed by `<level>` + [`TITLE_SEP`] + title.
const SECTION_MARK: char = '\u{1E}';
const TITLE_SEP: char = '\u{1F}';

static SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(#{1,3})[ \t]+(\S[^\n]*)$").unwrap());

// ---------------------------------------------------------------------------
// ThoughtNode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtNode {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ThoughtNode>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ThoughtKind>,
}

impl ThoughtNode {
    pub fn new(id: impl Into<String>, content: impl Into<String>, kind: ThoughtKind) -> Self {
        ThoughtNode { id: id.into(), content: content.into(), children: Vec::new(), kind: Some(kind) }
    }

    pub fn root() -> Self {
        ThoughtNode {
            id: ROOT_ID.to_string(),
            content: ROOT_CONTENT.to_string(),
            children: Vec::new(),
            kind: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first search by id.
    pub fn find(&self, id: &str) -> Option<&ThoughtNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Pre-order listing of this node and all descendants.
    pub fn descendants(&self) -> Vec<&ThoughtNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.descendants().len()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(ThoughtNode::depth).max().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct TreeParser {
    config: TreeConfig,
    max_input_bytes: usize,
}

impl TreeParser {
    pub fn new(config: TreeConfig) -> Self {
        TreeParser { config, max_input_bytes: usize::MAX }
    }

    pub fn with_input_limit(mut self, max_input_bytes: usize) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    pub fn parse(&self, text: &str) -> Result<ThoughtNode> {
        if text.len() > self.max_input_bytes {
            return Err(LensError::InputTooLarge { len: text.len(), max: self.max_input_bytes });
        }

        let cleaned = self.clean(text);
        let mut builder = TreeBuilder::new(&self.config);
        for (i, chunk) in cleaned.split(SECTION_MARK).enumerate() {
            // Chunk 0 precedes the first marker; later chunks start with one.
            match (i, chunk.split_once(TITLE_SEP)) {
                (0, _) | (_, None) => builder.unmarked(chunk),
                (_, Some((level, rest))) => {
                    let (title, body) = rest.split_once('\n').unwrap_or((rest, ""));
                    let level = level.trim().parse::<u8>().unwrap_or(1);
                    builder.marked(level, title.trim(), body);
                }
            }
        }

        let root = builder.finish();
        debug!(sections = root.children.len(), nodes = root.node_count(), "thought tree parsed");
        Ok(root)
    }

    /// Summarise code, turn `#`..`###` headings into section markers, then
    /// strip the remaining markdown markers.
    fn clean(&self, text: &str) -> String {
        let text = summarize_code_blocks(text, self.config.code_summary_chars);
        let marked = SECTION_HEADING.replace_all(&text, |c: &Captures| {
            let level = c.get(1).map_or(1, |m| m.as_str().len());
            let title = c.get(2).map_or("", |m| m.as_str()).trim();
            format!("{}{}{}{}", SECTION_MARK, level, TITLE_SEP, title)
        });
        let out = strip_heading_markers(&marked);
        let out = strip_list_markers(&out);
        strip_emphasis(&out)
    }
}

impl Default for TreeParser {
    fn default() -> Self {
        TreeParser::new(TreeConfig::default())
    }
}

struct TreeBuilder<'a> {
    config: &'a TreeConfig,
    root: ThoughtNode,
    sections: usize,
    orphans: usize,
    /// Index into `root.children` of the most recent section.
    current: Option<usize>,
}

impl<'a> TreeBuilder<'a> {
    fn new(config: &'a TreeConfig) -> Self {
        TreeBuilder { config, root: ThoughtNode::root(), sections: 0, orphans: 0, current: None }
    }

    fn open_section(&mut self, content: &str, kind: ThoughtKind) {
        let node = ThoughtNode::new(format!("section-{}", self.sections), content, kind);
        self.sections += 1;
        self.root.children.push(node);
        self.current = Some(self.root.children.len() - 1);
    }

    fn attach_leaf(&mut self, paragraph: &str) {
        let kind = classify(LEAF_RULES, &Subject::new(paragraph, 0, 1), ThoughtKind::Reasoning);
        match self.current {
            Some(idx) => {
                let section = &mut self.root.children[idx];
                let section_no = section.id.trim_start_matches("section-").to_string();
                let id = format!("para-{}-{}", section_no, section.children.len());
                section.children.push(ThoughtNode::new(id, paragraph, kind));
            }
            None => {
                let id = format!("orphan-{}", self.orphans);
                self.orphans += 1;
                self.root.children.push(ThoughtNode::new(id, paragraph, kind));
            }
        }
    }

    fn marked(&mut self, level: u8, title: &str, body: &str) {
        let kind = classify(
            MARKED_SECTION_RULES,
            &Subject::new(title, self.sections, 0).with_level(level),
            ThoughtKind::Reasoning,
        );
        self.open_section(title, kind);
        for para in split_paragraphs(body) {
            self.attach_leaf(para);
        }
    }

    fn unmarked(&mut self, chunk: &str) {
        for para in split_paragraphs(chunk) {
            if self.starts_section(para) {
                let kind = classify(
                    INFERRED_SECTION_RULES,
                    &Subject::new(para, self.sections, 0),
                    ThoughtKind::Reasoning,
                );
                self.open_section(para, kind);
            } else {
                self.attach_leaf(para);
            }
        }
    }

    fn starts_section(&self, para: &str) -> bool {
        para.chars().count() < self.config.short_paragraph_chars
            || starts_with_discourse_marker(para)
            || starts_with_step_marker(para)
    }

    fn finish(self) -> ThoughtNode {
        self.root
    }
}
