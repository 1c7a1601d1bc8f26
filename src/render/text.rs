use std::collections::HashSet;
use std::fmt::Write;

use colored::*;

use crate::classify::ThoughtKind;
use crate::markdown::{collapse_whitespace, truncate_chars};
use crate::timeline::TimelinePoint;
use crate::tree::ThoughtNode;

const NODE_TEXT_MAX: usize = 100;
const BAR_WIDTH: usize = 10;

pub fn kind_color(kind: ThoughtKind) -> Color {
    match kind {
        ThoughtKind::Premise => Color::BrightBlue,
        ThoughtKind::Reasoning => Color::BrightWhite,
        ThoughtKind::Evidence => Color::BrightGreen,
        ThoughtKind::Conclusion => Color::BrightMagenta,
        ThoughtKind::Alternative => Color::BrightYellow,
    }
}

/// `[kind]` left-aligned to `width` visible columns, then coloured.
fn kind_tag(kind: Option<ThoughtKind>, width: usize) -> String {
    match kind {
        Some(k) => format!("{:<width$}", format!("[{}]", k)).color(kind_color(k)).to_string(),
        None => String::new(),
    }
}

/// Strength as a ten-cell bar, e.g. `███████░░░`.
pub fn strength_bar(strength: u8) -> String {
    let filled = (strength as usize * BAR_WIDTH + 50) / 100;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Indented tree. Nodes with children show `▾` when expanded and `▸` when
/// collapsed; collapsed subtrees are not printed.
pub fn render_tree(root: &ThoughtNode, expanded: &HashSet<String>) -> String {
    let mut out = String::new();
    write_node(&mut out, root, expanded, 0);
    out
}

fn write_node(out: &mut String, node: &ThoughtNode, expanded: &HashSet<String>, depth: usize) {
    let open = expanded.contains(&node.id);
    let marker = match (node.is_leaf(), open) {
        (true, _) => "•",
        (false, true) => "▾",
        (false, false) => "▸",
    };
    let text = truncate_chars(&collapse_whitespace(&node.content), NODE_TEXT_MAX);
    let text = if depth == 0 { text.bold().to_string() } else { text };
    let tag = kind_tag(node.kind, 0);
    let sep = if tag.is_empty() { "" } else { " " };
    let _ = writeln!(out, "{}{} {}{}{}", "  ".repeat(depth), marker, tag, sep, text);

    if open {
        for child in &node.children {
            write_node(out, child, expanded, depth + 1);
        }
    }
}

/// One line per point plus an indented line listing its connections.
pub fn render_timeline(points: &[TimelinePoint]) -> String {
    let mut out = String::new();
    if points.is_empty() {
        let _ = writeln!(out, "{}", "(no reasoning steps)".dimmed());
        return out;
    }
    for p in points {
        let _ = writeln!(
            out,
            "{} {} {} {:>3}  {}",
            format!("{:<9}", p.id).bright_cyan(),
            kind_tag(Some(p.kind), 13),
            strength_bar(p.strength),
            p.strength,
            p.label
        );
        if !p.connections.is_empty() {
            let _ = writeln!(out, "          {} {}", "→".dimmed(), p.connections.join(", "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineParser;
    use crate::tree::TreeParser;

    #[test]
    fn test_strength_bar_extremes() {
        assert_eq!(strength_bar(0), "░".repeat(10));
        assert_eq!(strength_bar(100), "█".repeat(10));
        assert_eq!(strength_bar(75).chars().filter(|c| *c == '█').count(), 8);
    }

    #[test]
    fn test_render_tree_respects_expansion() {
        let root = TreeParser::default().parse("# Alpha\nfirst leaf\n# Beta\nsecond leaf").unwrap();
        let mut expanded: HashSet<String> = ["root", "section-0"].iter().map(|s| s.to_string()).collect();
        let out = render_tree(&root, &expanded);
        assert!(out.contains("Alpha"));
        assert!(out.contains("first leaf"));
        assert!(out.contains("Beta"));
        assert!(!out.contains("second leaf"));
        assert!(out.contains('▸'));

        expanded.insert("section-1".to_string());
        assert!(render_tree(&root, &expanded).contains("second leaf"));
    }

    #[test]
    fn test_render_tree_collapsed_root_is_one_line() {
        let root = TreeParser::default().parse("# Alpha\nleaf").unwrap();
        let out = render_tree(&root, &HashSet::new());
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("Thought Process"));
    }

    #[test]
    fn test_render_timeline_lists_points_and_edges() {
        let points = TimelineParser::default()
            .parse("# Premise\nCats are mammals.\n\n# Conclusion\nFeed protein.")
            .unwrap();
        let out = render_timeline(&points);
        assert!(out.contains("point-0"));
        assert!(out.contains("Premise"));
        assert!(out.contains("premise"));
        assert!(out.contains("point-0"));
        assert!(out.lines().any(|l| l.contains('→') && l.contains("point-0")));
    }

    #[test]
    fn test_render_timeline_columns_align_with_colour() {
        colored::control::set_override(true);
        let points = TimelineParser::default()
            .parse("# Premise\nA.\n\n# Evidence\nB.\n\n# Conclusion\nC.")
            .unwrap();
        let out = render_timeline(&points);
        colored::control::unset_override();

        let ansi = regex::Regex::new(r"\x1b\[[0-9;]*m").unwrap();
        let plain = ansi.replace_all(&out, "");
        let bar_columns: Vec<usize> = plain
            .lines()
            .filter(|l| l.starts_with("point-"))
            .map(|l| l.chars().position(|c| c == '█' || c == '░').unwrap())
            .collect();
        assert_eq!(bar_columns.len(), 3);
        assert!(bar_columns.iter().all(|&c| c == bar_columns[0]));
        assert_eq!(bar_columns[0], 24);
    }

    #[test]
    fn test_render_timeline_empty() {
        assert!(render_timeline(&[]).contains("no reasoning steps"));
    }
}
