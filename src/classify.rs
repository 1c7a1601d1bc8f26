//! Reasoning-unit classification as ordered rule tables.
//!
//! Each table is a list of `(predicate, kind)` pairs evaluated top to bottom;
//! the first predicate that holds decides the kind, otherwise the caller's
//! fallback applies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Role a piece of reasoning plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtKind {
    Premise,
    Reasoning,
    Evidence,
    Conclusion,
    Alternative,
}

impl ThoughtKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ThoughtKind::Premise => "premise",
            ThoughtKind::Reasoning => "reasoning",
            ThoughtKind::Evidence => "evidence",
            ThoughtKind::Conclusion => "conclusion",
            ThoughtKind::Alternative => "alternative",
        }
    }

    pub fn from_str_loose(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "premise" => Ok(ThoughtKind::Premise),
            "reasoning" => Ok(ThoughtKind::Reasoning),
            "evidence" => Ok(ThoughtKind::Evidence),
            "conclusion" => Ok(ThoughtKind::Conclusion),
            "alternative" => Ok(ThoughtKind::Alternative),
            _ => Err(format!("Unknown thought kind: {}", s)),
        }
    }

    pub fn all() -> &'static [ThoughtKind] {
        &[
            ThoughtKind::Premise,
            ThoughtKind::Reasoning,
            ThoughtKind::Evidence,
            ThoughtKind::Conclusion,
            ThoughtKind::Alternative,
        ]
    }
}

impl std::fmt::Display for ThoughtKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Indicator patterns
// ---------------------------------------------------------------------------

static EVIDENCE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(for example|for instance|evidence|data (shows|suggests|indicates)|according to|studies (show|suggest)|research (shows|indicates)|observed|observation|statistics|measured)\b",
    )
    .unwrap()
});

static ALTERNATIVE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(alternatively|on the other hand|another (approach|option|possibility|way)|in contrast|other perspective|alternative)\b",
    )
    .unwrap()
});

static PREMISE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(first|to begin|let's|let us|given|assume|assuming)\b").unwrap()
});

static DISCOURSE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(first|let's|to begin|next|now|finally|in conclusion|therefore)\b").unwrap()
});

static STEP_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(step\s+\d+|analysis|considering|alternatively|however,|on the other hand)")
        .unwrap()
});

pub fn has_evidence_indicator(text: &str) -> bool {
    EVIDENCE_PHRASE.is_match(text)
}

pub fn has_alternative_indicator(text: &str) -> bool {
    ALTERNATIVE_PHRASE.is_match(text)
}

pub fn starts_with_premise_word(text: &str) -> bool {
    PREMISE_START.is_match(text.trim_start())
}

/// Paragraph opens with a discourse marker (First, Next, Therefore, ...).
pub fn starts_with_discourse_marker(text: &str) -> bool {
    DISCOURSE_START.is_match(text.trim_start())
}

/// Paragraph opens with a step or pivot marker (Step 2, Analysis, However, ...).
pub fn starts_with_step_marker(text: &str) -> bool {
    STEP_START.is_match(text.trim_start())
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// What a rule gets to look at.
#[derive(Debug, Clone)]
pub struct Subject<'a> {
    pub text: &'a str,
    pub lower: String,
    pub index: usize,
    pub total: usize,
    /// Heading level for tree sections; `None` elsewhere.
    pub level: Option<u8>,
}

impl<'a> Subject<'a> {
    pub fn new(text: &'a str, index: usize, total: usize) -> Self {
        Subject { text, lower: text.to_lowercase(), index, total, level: None }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    fn is_first(&self) -> bool {
        self.index == 0
    }

    fn is_last(&self) -> bool {
        self.total > 0 && self.index + 1 == self.total
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.lower.contains(n))
    }
}

pub type Predicate = fn(&Subject<'_>) -> bool;

pub struct Rule {
    pub name: &'static str,
    pub when: Predicate,
    pub kind: ThoughtKind,
}

/// First matching rule wins.
pub fn classify(rules: &[Rule], subject: &Subject<'_>, fallback: ThoughtKind) -> ThoughtKind {
    rules
        .iter()
        .find(|r| (r.when)(subject))
        .map(|r| {
            tracing::trace!(rule = r.name, kind = %r.kind, "classified");
            r.kind
        })
        .unwrap_or(fallback)
}

const PREMISE_WORDS: &[&str] =
    &["premise", "assumption", "given", "background", "context", "introduction", "problem"];
const EVIDENCE_WORDS: &[&str] = &["evidence", "data", "observation"];
const CONCLUSION_WORDS: &[&str] = &["conclusion", "summary", "therefore", "final", "result"];
const ALTERNATIVE_WORDS: &[&str] = &["alternative", "other perspective"];

/// Timeline heading classification. Fallback: reasoning.
pub static HEADING_RULES: &[Rule] = &[
    Rule {
        name: "premise-heading",
        when: |s: &Subject<'_>| s.contains_any(PREMISE_WORDS) || s.is_first(),
        kind: ThoughtKind::Premise,
    },
    Rule {
        name: "evidence-heading",
        when: |s: &Subject<'_>| s.contains_any(EVIDENCE_WORDS),
        kind: ThoughtKind::Evidence,
    },
    Rule {
        name: "conclusion-heading",
        when: |s: &Subject<'_>| s.contains_any(CONCLUSION_WORDS) || s.is_last(),
        kind: ThoughtKind::Conclusion,
    },
    Rule {
        name: "alternative-heading",
        when: |s: &Subject<'_>| s.contains_any(ALTERNATIVE_WORDS),
        kind: ThoughtKind::Alternative,
    },
];

/// Timeline paragraph classification. Fallback: reasoning.
pub static PARAGRAPH_RULES: &[Rule] = &[
    Rule { name: "first-paragraph", when: |s: &Subject<'_>| s.is_first(), kind: ThoughtKind::Premise },
    Rule { name: "last-paragraph", when: |s: &Subject<'_>| s.is_last(), kind: ThoughtKind::Conclusion },
    Rule {
        name: "evidence-phrase",
        when: |s: &Subject<'_>| has_evidence_indicator(s.text),
        kind: ThoughtKind::Evidence,
    },
    Rule {
        name: "alternative-phrase",
        when: |s: &Subject<'_>| has_alternative_indicator(s.text),
        kind: ThoughtKind::Alternative,
    },
];

/// Tree section built from a markdown heading. Fallback: reasoning.
pub static MARKED_SECTION_RULES: &[Rule] = &[
    Rule {
        name: "conclusion-title",
        when: |s: &Subject<'_>| s.lower.contains("conclusion"),
        kind: ThoughtKind::Conclusion,
    },
    Rule {
        name: "alternative-title",
        when: |s: &Subject<'_>| s.lower.contains("alternative"),
        kind: ThoughtKind::Alternative,
    },
    Rule { name: "top-level-title", when: |s: &Subject<'_>| s.level == Some(1), kind: ThoughtKind::Premise },
];

/// Tree section inferred from an unmarked paragraph. Fallback: reasoning.
pub static INFERRED_SECTION_RULES: &[Rule] = &[
    Rule {
        name: "conclusion-paragraph",
        when: |s: &Subject<'_>| s.lower.contains("conclusion"),
        kind: ThoughtKind::Conclusion,
    },
    Rule {
        name: "alternative-paragraph",
        when: |s: &Subject<'_>| s.lower.contains("alternative"),
        kind: ThoughtKind::Alternative,
    },
    Rule {
        name: "premise-opening",
        when: |s: &Subject<'_>| starts_with_premise_word(s.text),
        kind: ThoughtKind::Premise,
    },
];

/// Tree leaf paragraph. Fallback: reasoning.
pub static LEAF_RULES: &[Rule] = &[Rule {
    name: "evidence-leaf",
    when: |s: &Subject<'_>| has_evidence_indicator(s.text),
    kind: ThoughtKind::Evidence,
}];
