//! SVG timeline renderer.
//!
//! `Flat` lays points out left to right and draws straight edges.
//! `Perspective` uses each point's circle position, squashes the y axis to
//! fake depth, scales markers by that depth and draws quadratic-curve edges.

use std::collections::HashMap;
use std::fmt::Write;

use clap::ValueEnum;

use crate::classify::ThoughtKind;
use crate::markdown::truncate_chars;
use crate::timeline::TimelinePoint;

const MARGIN: f64 = 60.0;
const FLAT_SPACING: f64 = 160.0;
const FLAT_HEIGHT: f64 = 240.0;
const TILT: f64 = 0.55;
const CURVE_LIFT: f64 = 40.0;
const SVG_LABEL_MAX: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SvgLayout {
    #[default]
    Flat,
    Perspective,
}

impl SvgLayout {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "perspective" | "graph" | "3d" => SvgLayout::Perspective,
            _ => SvgLayout::Flat,
        }
    }
}

pub fn kind_fill(kind: ThoughtKind) -> &'static str {
    match kind {
        ThoughtKind::Premise => "#58a6ff",
        ThoughtKind::Reasoning => "#c9d1d9",
        ThoughtKind::Evidence => "#3fb950",
        ThoughtKind::Conclusion => "#a371f7",
        ThoughtKind::Alternative => "#f0883e",
    }
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Marker radius: 6px plus one pixel per ten strength points.
pub fn marker_radius(strength: u8) -> f64 {
    6.0 + f64::from(strength) / 10.0
}

struct Placed<'a> {
    point: &'a TimelinePoint,
    x: f64,
    y: f64,
    scale: f64,
}

fn place_flat(points: &[TimelinePoint]) -> (Vec<Placed<'_>>, f64, f64) {
    let width = MARGIN * 2.0 + FLAT_SPACING * points.len().saturating_sub(1) as f64;
    let placed = points
        .iter()
        .enumerate()
        .map(|(i, p)| Placed { point: p, x: MARGIN + FLAT_SPACING * i as f64, y: FLAT_HEIGHT / 2.0, scale: 1.0 })
        .collect();
    (placed, width, FLAT_HEIGHT)
}

fn place_perspective(points: &[TimelinePoint]) -> (Vec<Placed<'_>>, f64, f64) {
    let radius = points
        .iter()
        .map(|p| p.position.x.abs().max(p.position.y.abs()))
        .fold(1.0_f64, f64::max);
    let cx = radius + MARGIN;
    let cy = radius * TILT + MARGIN;
    let placed = points
        .iter()
        .map(|p| {
            // Points lower on the page read as closer to the viewer.
            let depth = (p.position.y + radius) / (2.0 * radius);
            Placed {
                point: p,
                x: cx + p.position.x,
                y: cy + p.position.y * TILT,
                scale: 0.7 + 0.6 * depth,
            }
        })
        .collect();
    (placed, cx * 2.0, cy * 2.0)
}

pub fn render_timeline_svg(points: &[TimelinePoint], layout: SvgLayout) -> String {
    let (placed, width, height) = match layout {
        SvgLayout::Flat => place_flat(points),
        SvgLayout::Perspective => place_perspective(points),
    };
    let index: HashMap<&str, &Placed<'_>> =
        placed.iter().map(|p| (p.point.id.as_str(), p)).collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
        w = width,
        h = height
    );
    let _ = writeln!(out, r##"<rect width="100%" height="100%" fill="#0d1117"/>"##);

    if points.is_empty() {
        let _ = writeln!(
            out,
            r##"<text x="{:.0}" y="{:.0}" fill="#8b949e" text-anchor="middle">No reasoning steps</text>"##,
            width / 2.0,
            height / 2.0
        );
        out.push_str("</svg>\n");
        return out;
    }

    let _ = writeln!(out, r##"<g class="edges" stroke="#30363d" stroke-width="1.5" fill="none">"##);
    for from in &placed {
        for target in &from.point.connections {
            let Some(to) = index.get(target.as_str()) else { continue };
            match layout {
                SvgLayout::Flat => {
                    let _ = writeln!(
                        out,
                        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}"/>"#,
                        from.x, from.y, to.x, to.y
                    );
                }
                SvgLayout::Perspective => {
                    let mx = (from.x + to.x) / 2.0;
                    let my = (from.y + to.y) / 2.0 - CURVE_LIFT;
                    let _ = writeln!(
                        out,
                        r#"<path d="M {:.1} {:.1} Q {:.1} {:.1} {:.1} {:.1}"/>"#,
                        from.x, from.y, mx, my, to.x, to.y
                    );
                }
            }
        }
    }
    out.push_str("</g>\n");

    // Far points first so near ones paint over them.
    let mut order: Vec<&Placed<'_>> = placed.iter().collect();
    order.sort_by(|a, b| a.scale.total_cmp(&b.scale));
    for p in order {
        let r = marker_radius(p.point.strength) * p.scale;
        let _ = writeln!(
            out,
            r#"<g class="point {kind}" data-id="{id}"><circle cx="{x:.1}" cy="{y:.1}" r="{r:.1}" fill="{fill}" fill-opacity="{op:.2}"/><text x="{x:.1}" y="{ty:.1}" fill="{fill}" font-size="11" text-anchor="middle">{label}</text></g>"#,
            kind = p.point.kind,
            id = escape_xml(&p.point.id),
            x = p.x,
            y = p.y,
            r = r,
            fill = kind_fill(p.point.kind),
            op = 0.35 + f64::from(p.point.strength) / 160.0,
            ty = p.y + r + 14.0,
            label = escape_xml(&truncate_chars(&p.point.label, SVG_LABEL_MAX)),
        );
    }
    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineParser;

    fn points() -> Vec<TimelinePoint> {
        TimelineParser::default()
            .parse("# Premise <A>\nCats & dogs.\n\n# Middle\nx\n\n# Conclusion\nFeed protein.")
            .unwrap()
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }

    #[test]
    fn test_flat_has_line_edges_and_markers() {
        let svg = render_timeline_svg(&points(), SvgLayout::Flat);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 3);
        // point-1 -> point-0, point-2 -> point-1, point-2 -> point-0
        assert_eq!(svg.matches("<line").count(), 3);
        assert!(!svg.contains("<path"));
        assert!(svg.contains("Premise &lt;A&gt;"));
    }

    #[test]
    fn test_perspective_uses_curves() {
        let svg = render_timeline_svg(&points(), SvgLayout::Perspective);
        assert_eq!(svg.matches("<path").count(), 3);
        assert!(svg.contains(" Q "));
        assert!(!svg.contains("<line"));
    }

    #[test]
    fn test_empty_points() {
        let svg = render_timeline_svg(&[], SvgLayout::Flat);
        assert!(svg.contains("No reasoning steps"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn test_marker_radius_grows_with_strength() {
        assert!(marker_radius(90) > marker_radius(40));
        assert_eq!(marker_radius(0), 6.0);
    }

    #[test]
    fn test_layout_from_str_loose() {
        assert_eq!(SvgLayout::from_str_loose("graph"), SvgLayout::Perspective);
        assert_eq!(SvgLayout::from_str_loose("anything"), SvgLayout::Flat);
    }
}
