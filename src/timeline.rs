//! # Timeline parser
//!
//! Turns reasoning text into an ordered list of [`TimelinePoint`]s.
//!
//! Three paths, tried in order:
//! 1. **Headings**: every markdown heading opens a point whose description is
//!    the text up to the next heading. Scoring is deterministic.
//! 2. **Paragraphs**: with no headings and two or more blank-line separated
//!    paragraphs, each paragraph is a point. Strength has a random base.
//! 3. **Single block**: anything else non-empty is one reasoning point.
//!
//! Point order is the timeline order and ids are `point-0..point-(n-1)`.

use std::collections::HashSet;
use std::f64::consts::TAU;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{classify, Subject, ThoughtKind, HEADING_RULES, PARAGRAPH_RULES};
use crate::config::TimelineConfig;
use crate::error::{LensError, Result};
use crate::markdown::{
    code_fence_spans, collapse_whitespace, split_paragraphs, strip_markdown, truncate_chars,
};
use crate::scoring::{paragraph_strength, rng_for, section_strength, SINGLE_BLOCK_STRENGTH};

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(#{1,6})[ \t]+(\S[^\n]*)$").unwrap());
static FIRST_SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^.!?]*[.!?]").unwrap());

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Layout coordinate. `z` is always 0; renderers derive depth themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ThoughtKind,
    /// Heuristic confidence in `[0, 100]`.
    pub strength: u8,
    /// Ids this point refers to, in insertion order.
    pub connections: Vec<String>,
    pub position: Position,
}

impl TimelinePoint {
    /// Add an edge to `target` unless it is this point or already present.
    /// Returns whether an edge was added.
    pub fn connect(&mut self, target: &str) -> bool {
        if target == self.id || self.connections.iter().any(|c| c == target) {
            return false;
        }
        self.connections.push(target.to_string());
        true
    }

    pub fn is_connected_to(&self, target: &str) -> bool {
        self.connections.iter().any(|c| c == target)
    }
}

pub fn point_id(index: usize) -> String {
    format!("point-{}", index)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct TimelineParser {
    config: TimelineConfig,
    max_input_bytes: usize,
}

impl TimelineParser {
    pub fn new(config: TimelineConfig) -> Self {
        TimelineParser { config, max_input_bytes: usize::MAX }
    }

    pub fn with_input_limit(mut self, max_input_bytes: usize) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Parse using an RNG seeded from `config.seed` (entropy when unset).
    pub fn parse(&self, text: &str) -> Result<Vec<TimelinePoint>> {
        let mut rng = rng_for(self.config.seed);
        self.parse_with_rng(text, &mut rng)
    }

    /// Parse drawing paragraph-path strength from `rng`.
    pub fn parse_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        rng: &mut R,
    ) -> Result<Vec<TimelinePoint>> {
        if text.len() > self.max_input_bytes {
            return Err(LensError::InputTooLarge { len: text.len(), max: self.max_input_bytes });
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let points = match self.parse_headings(text) {
            Some(points) => points,
            None => {
                let paragraphs = split_paragraphs(text);
                if paragraphs.len() >= 2 {
                    self.parse_paragraphs(&paragraphs, rng)
                } else {
                    vec![self.single_block(text)]
                }
            }
        };
        debug!(points = points.len(), "timeline parsed");
        Ok(points)
    }

    // -----------------------------------------------------------------------
    // Heading path
    // -----------------------------------------------------------------------

    fn parse_headings(&self, text: &str) -> Option<Vec<TimelinePoint>> {
        // `#` lines inside fenced code are comments, not headings.
        let fences = code_fence_spans(text);
        let headings: Vec<(usize, usize, &str)> = HEADING_LINE
            .captures_iter(text)
            .filter_map(|c| {
                let whole = c.get(0)?;
                if fences.iter().any(|f| f.contains(&whole.start())) {
                    return None;
                }
                let title = c.get(2)?.as_str().trim();
                Some((whole.start(), whole.end(), title))
            })
            .collect();
        if headings.is_empty() {
            return None;
        }

        let total = headings.len();
        let mut points: Vec<TimelinePoint> = headings
            .iter()
            .enumerate()
            .map(|(i, &(_, end, title))| {
                let next_start = headings.get(i + 1).map_or(text.len(), |h| h.0);
                let section = text[end..next_start].trim();

                let mut label = truncate_chars(&strip_markdown(title), self.config.label_max);
                if label.is_empty() {
                    label = format!("Step {}", i + 1);
                }
                let kind =
                    classify(HEADING_RULES, &Subject::new(title, i, total), ThoughtKind::Reasoning);
                let description =
                    if section.is_empty() { title.to_string() } else { section.to_string() };

                let mut point = TimelinePoint {
                    id: point_id(i),
                    label,
                    description,
                    kind,
                    strength: section_strength(section),
                    connections: Vec::new(),
                    position: self.circle_position(i, total),
                };
                if i > 0 {
                    point.connect(&point_id(i - 1));
                }
                point
            })
            .collect();

        link_conclusions(&mut points);
        Some(points)
    }

    // -----------------------------------------------------------------------
    // Paragraph path
    // -----------------------------------------------------------------------

    fn parse_paragraphs<R: Rng + ?Sized>(
        &self,
        paragraphs: &[&str],
        rng: &mut R,
    ) -> Vec<TimelinePoint> {
        let total = paragraphs.len();
        let mut points: Vec<TimelinePoint> = paragraphs
            .iter()
            .enumerate()
            .map(|(i, para)| {
                let kind = classify(
                    PARAGRAPH_RULES,
                    &Subject::new(para, i, total),
                    ThoughtKind::Reasoning,
                );
                let mut point = TimelinePoint {
                    id: point_id(i),
                    label: self.paragraph_label(para),
                    description: para.to_string(),
                    kind,
                    strength: paragraph_strength(kind, rng),
                    connections: Vec::new(),
                    position: self.circle_position(i, total),
                };
                if i > 0 {
                    point.connect(&point_id(i - 1));
                }
                point
            })
            .collect();

        if total >= 3
            && points[0].kind == ThoughtKind::Premise
            && points[total - 1].kind == ThoughtKind::Conclusion
        {
            points[total - 1].connect(&point_id(0));
        }

        self.link_shared_words(&mut points);
        points
    }

    /// Link `i -> j` when the labels share a word longer than four
    /// characters. Self links are excluded and the number of added links is
    /// capped by `max_overlap_edges`.
    fn link_shared_words(&self, points: &mut [TimelinePoint]) {
        let words: Vec<HashSet<String>> = points
            .iter()
            .map(|p| {
                p.label
                    .to_lowercase()
                    .split_whitespace()
                    .filter(|w| w.chars().count() > 4)
                    .map(str::to_string)
                    .collect()
            })
            .collect();

        let mut added = 0usize;
        for i in 0..points.len() {
            for j in 0..points.len() {
                if i == j || words[i].is_disjoint(&words[j]) {
                    continue;
                }
                if added >= self.config.max_overlap_edges {
                    debug!(cap = self.config.max_overlap_edges, "overlap link cap reached");
                    return;
                }
                if points[i].connect(&point_id(j)) {
                    added += 1;
                }
            }
        }
    }

    /// First sentence, else a prefix; markers stripped; length-bounded.
    fn paragraph_label(&self, para: &str) -> String {
        let raw = match FIRST_SENTENCE.find(para) {
            Some(m) => m.as_str().to_string(),
            None => {
                let prefix: String = para.chars().take(self.config.fallback_label_chars).collect();
                if para.chars().count() > self.config.fallback_label_chars {
                    format!("{}...", prefix)
                } else {
                    prefix
                }
            }
        };
        let clean = collapse_whitespace(&strip_markdown(&raw));
        truncate_chars(&clean, self.config.label_max)
    }

    // -----------------------------------------------------------------------
    // Single block
    // -----------------------------------------------------------------------

    fn single_block(&self, text: &str) -> TimelinePoint {
        let body = text.trim();
        TimelinePoint {
            id: point_id(0),
            label: self.paragraph_label(body),
            description: body.to_string(),
            kind: ThoughtKind::Reasoning,
            strength: SINGLE_BLOCK_STRENGTH,
            connections: Vec::new(),
            position: Position::default(),
        }
    }

    fn circle_position(&self, index: usize, total: usize) -> Position {
        let angle = TAU * index as f64 / total.max(1) as f64;
        Position {
            x: self.config.radius * angle.cos(),
            y: self.config.radius * angle.sin(),
            z: 0.0,
        }
    }
}

impl Default for TimelineParser {
    fn default() -> Self {
        TimelineParser::new(TimelineConfig::default())
    }
}

/// Every conclusion point links to every premise and evidence point.
fn link_conclusions(points: &mut [TimelinePoint]) {
    let supports: Vec<String> = points
        .iter()
        .filter(|p| matches!(p.kind, ThoughtKind::Premise | ThoughtKind::Evidence))
        .map(|p| p.id.clone())
        .collect();
    for point in points.iter_mut().filter(|p| p.kind == ThoughtKind::Conclusion) {
        for id in &supports {
            point.connect(id);
        }
    }
}
