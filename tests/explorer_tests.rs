//! External tests for the explorer: debouncing, memoization, expansion and
//! selection across content changes.

use thought_lens::config::{ExplorerConfig, LensConfig, LimitsConfig};
use thought_lens::{Explorer, ViewMode};

const DOC: &str = "# Premise\nCats are mammals.\n\n# Evidence\nFor example, they hunt.\n\n# Conclusion\nFeed protein.";

fn explorer(debounce_ms: u64) -> Explorer {
    Explorer::new(&LensConfig { explorer: ExplorerConfig { debounce_ms }, ..LensConfig::default() })
}

#[test]
fn test_typing_burst_parses_once() {
    let mut ex = explorer(100);
    let mut parses = 0;
    for (t, prefix_len) in [(0u64, 10usize), (40, 30), (80, 60)] {
        ex.set_content(&DOC[..prefix_len], t);
        if ex.poll(t + 20) {
            parses += 1;
        }
    }
    assert_eq!(parses, 0);
    assert!(ex.timeline().is_none());

    ex.set_content(DOC, 120);
    assert!(!ex.poll(219));
    assert!(ex.poll(220));
    assert_eq!(ex.timeline().map(<[_]>::len), Some(3));
}

#[test]
fn test_same_content_is_memoized() {
    let mut ex = explorer(0);
    ex.set_content(DOC, 0);
    assert!(ex.poll(0));
    ex.set_content(DOC, 10);
    assert!(!ex.poll(10));
    assert!(!ex.has_pending());
    assert!(ex.tree().is_some());
}

#[test]
fn test_expansion_initialised_once() {
    let mut ex = explorer(0);
    ex.set_content(DOC, 0);
    ex.flush();
    assert!(ex.is_expanded("root"));
    assert!(ex.is_expanded("section-0"));
    assert!(ex.is_expanded("section-2"));
    assert!(!ex.is_expanded("para-0-0"));

    ex.toggle("section-1");
    ex.set_content(format!("{}\n\n# Alternative\nFish.", DOC), 1);
    ex.flush();
    assert!(!ex.is_expanded("section-1"));
    assert!(!ex.is_expanded("section-3"));
}

#[test]
fn test_expand_and_collapse_all() {
    let mut ex = explorer(0);
    ex.set_content(DOC, 0);
    ex.flush();
    ex.expand_all();
    assert!(ex.is_expanded("para-2-0"));
    ex.collapse_all();
    assert!(ex.expanded().is_empty());
}

#[test]
fn test_selection_and_neighbors() {
    let mut ex = explorer(0);
    ex.set_content(DOC, 0);
    ex.flush();
    assert!(ex.select("point-1"));
    assert_eq!(ex.selected().map(|p| p.label.as_str()), Some("Evidence"));
    assert_eq!(ex.neighbors("point-1"), vec!["point-0", "point-2"]);
    assert!(!ex.select("point-99"));
    assert_eq!(ex.selected().map(|p| p.id.as_str()), Some("point-1"));
}

#[test]
fn test_selection_dropped_when_point_disappears() {
    let mut ex = explorer(0);
    ex.set_content(DOC, 0);
    ex.flush();
    ex.select("point-2");
    ex.set_content("# Only\nOne section.", 1);
    ex.flush();
    assert!(ex.selected().is_none());
}

#[test]
fn test_oversized_content_clears_results() {
    let mut ex = Explorer::new(&LensConfig {
        explorer: ExplorerConfig { debounce_ms: 0 },
        limits: LimitsConfig { max_input_bytes: 32 },
        ..LensConfig::default()
    });
    ex.set_content("# Short\nok", 0);
    ex.flush();
    assert!(ex.timeline().is_some());

    ex.set_content(DOC, 1);
    assert!(ex.flush());
    assert!(ex.timeline().is_none());
    assert!(ex.tree().is_none());
    assert!(ex.take_error().is_some());
}

#[test]
fn test_view_mode_round_trip() {
    let mut ex = Explorer::default();
    assert_eq!(ex.mode(), ViewMode::Timeline);
    ex.set_mode(ViewMode::Graph);
    assert_eq!(ex.mode(), ViewMode::Graph);
    assert_eq!(ViewMode::Tree.to_string(), "tree");
}
