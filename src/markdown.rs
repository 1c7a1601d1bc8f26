//! Markdown normalisation shared by both parsers and the speech client.
//!
//! These helpers do not try to be a markdown implementation. They remove the
//! markers a chat model typically emits (headings, bullets, numbered lists,
//! emphasis, inline code, fenced code) so the remaining text reads cleanly
//! as a label, a tree node, or speech input.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HEADING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").unwrap());
static BULLET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").unwrap());
static NUMBERED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").unwrap());
static ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w])_([^_\n]+)_([^\w]|$)").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n`]*\n?(.*?)```").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").unwrap());
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n[ \t\r]*\n").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Remove `**bold**`, `__bold__`, `*italic*`, `_italic_` and `` `code` `` markers,
/// keeping the wrapped text.
pub fn strip_emphasis(text: &str) -> String {
    let out = BOLD.replace_all(text, |c: &Captures| {
        c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str()).to_string()
    });
    let out = ITALIC_STAR.replace_all(&out, "$1");
    let out = ITALIC_UNDERSCORE.replace_all(&out, "$1$2$3");
    INLINE_CODE.replace_all(&out, "$1").into_owned()
}

/// Remove bullet and numbered-list prefixes at the start of each line.
pub fn strip_list_markers(text: &str) -> String {
    let out = BULLET_PREFIX.replace_all(text, "");
    NUMBERED_PREFIX.replace_all(&out, "").into_owned()
}

/// Remove leading `#` runs from heading lines.
pub fn strip_heading_markers(text: &str) -> String {
    HEADING_PREFIX.replace_all(text, "").into_owned()
}

/// Headings, lists and emphasis removed; surrounding whitespace trimmed.
pub fn strip_markdown(text: &str) -> String {
    let out = strip_heading_markers(text);
    let out = strip_list_markers(&out);
    strip_emphasis(&out).trim().to_string()
}

/// Replace every fenced code block with `[Code snippet: <prefix>]`.
///
/// The prefix is the block body with whitespace collapsed, cut to
/// `max_chars` characters and suffixed with `...` when it was longer.
pub fn summarize_code_blocks(text: &str, max_chars: usize) -> String {
    CODE_FENCE
        .replace_all(text, |c: &Captures| {
            let body = c.get(1).map_or("", |m| m.as_str());
            let flat = collapse_whitespace(body);
            let mut summary: String = flat.chars().take(max_chars).collect();
            if flat.chars().count() > max_chars {
                summary.push_str("...");
            }
            format!("[Code snippet: {}]", summary)
        })
        .into_owned()
}

/// Byte ranges of every fenced code block, fences included.
pub fn code_fence_spans(text: &str) -> Vec<Range<usize>> {
    CODE_FENCE.find_iter(text).map(|m| m.range()).collect()
}

/// Text suitable for a speech engine: code and link targets dropped,
/// markers stripped, whitespace collapsed.
pub fn to_speech_text(text: &str) -> String {
    let out = CODE_FENCE.replace_all(text, " ");
    let out = LINK.replace_all(&out, "$1");
    let out = strip_markdown(&out);
    collapse_whitespace(&out)
}

/// Split on blank lines (LF or CRLF); each paragraph is trimmed and empties are dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Cut `text` to at most `max` characters, ending in `...` when cut.
/// Below three characters there is no room for the ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return text.chars().take(max).collect();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
