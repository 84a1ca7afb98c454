//! SVG export serializer.
//!
//! Renders a string art result as an SVG document using the [`svg`]
//! crate for document construction and XML escaping. The coordinate
//! space is the pipeline canvas: `viewBox="0 0 size size"`.
//!
//! Connections become `<line>` elements grouped by
//! [`QualityTier`](crate::quality::QualityTier), one `<g>` per tier in
//! drawing order, each carrying its own stroke opacity and width. Pins
//! are drawn on top as small filled circles.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Text;
use svg::node::element::{Circle, Description, Group, Line, Rectangle, Title};

use strand_pipeline::StringArtResult;

use crate::quality::group_by_tier;

/// Radius of a pin marker in canvas pixels.
pub const PIN_RADIUS: f64 = 1.5;
/// Fill color of pin markers.
pub const PIN_COLOR: &str = "#2d3748";

/// Metadata to embed in the SVG document.
///
/// When present, a `<title>` and/or `<desc>` element is emitted right
/// after the opening `<svg>` tag. Text is XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, typically the source image filename.
    pub title: Option<&'a str>,

    /// Document description, typically the generation parameters.
    pub description: Option<&'a str>,
}

/// Serialize a result into an SVG document string.
///
/// `line_opacity` is the base thread opacity; each tier multiplies it by
/// its [`opacity_factor`](crate::quality::QualityTier::opacity_factor).
/// Connections referring to pins that do not exist are skipped.
///
/// # Examples
///
/// ```
/// use strand_export::{SvgMetadata, to_svg};
/// use strand_pipeline::{StringArtConfig, generate};
///
/// let config = StringArtConfig {
///     pin_count: 8,
///     max_connections: 0,
///     canvas_size: 40,
///     ..StringArtConfig::default()
/// };
/// let result = generate(&strand_pipeline::RgbaImage::new(40, 40), &config).unwrap();
/// let metadata = SvgMetadata {
///     title: Some("portrait"),
///     description: None,
/// };
/// let svg = to_svg(&result, config.line_opacity, &metadata);
/// assert!(svg.contains(r#"viewBox="0 0 40 40""#));
/// assert!(svg.contains("<title>portrait</title>"));
/// ```
#[must_use]
pub fn to_svg(result: &StringArtResult, line_opacity: f64, metadata: &SvgMetadata<'_>) -> String {
    let dims = result.dimensions();
    let (w, h) = (dims.width, dims.height);

    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    doc = doc.add(
        Rectangle::new()
            .set("width", w)
            .set("height", h)
            .set("fill", "#ffffff"),
    );

    for (tier, connections) in group_by_tier(&result.connections) {
        if connections.is_empty() {
            continue;
        }
        let opacity = line_opacity * tier.opacity_factor();
        let mut group = Group::new()
            .set("stroke", "#000000")
            .set("stroke-opacity", opacity)
            .set("stroke-width", tier.stroke_width())
            .set("stroke-linecap", "round");
        for c in connections {
            let (Some(a), Some(b)) = (result.pins.get(c.from), result.pins.get(c.to)) else {
                continue;
            };
            group = group.add(
                Line::new()
                    .set("x1", a.x)
                    .set("y1", a.y)
                    .set("x2", b.x)
                    .set("y2", b.y),
            );
        }
        doc = doc.add(group);
    }

    let mut pins = Group::new().set("fill", PIN_COLOR);
    for pin in &result.pins {
        pins = pins.add(
            Circle::new()
                .set("cx", pin.x)
                .set("cy", pin.y)
                .set("r", PIN_RADIUS),
        );
    }
    doc = doc.add(pins);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strand_pipeline::{Connection, DensityField, TerminationReason, generate_pins};

    use super::*;

    fn result_with(connections: Vec<Connection>) -> StringArtResult {
        StringArtResult {
            pins: generate_pins(8, 100).unwrap(),
            connections,
            density: DensityField::new(100, 100),
            grayscale: DensityField::new(100, 100),
            termination: TerminationReason::StuckLimit,
            iterations: 0,
        }
    }

    #[test]
    fn document_structure() {
        let svg = to_svg(&result_with(Vec::new()), 0.3, &SvgMetadata::default());
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(svg.contains("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 100 100""#));
        assert!(svg.contains("</svg>"));
        assert!(!svg.contains("<title>"));
        assert!(!svg.contains("<desc>"));
    }

    #[test]
    fn one_circle_per_pin() {
        let svg = to_svg(&result_with(Vec::new()), 0.3, &SvgMetadata::default());
        assert_eq!(svg.matches("<circle").count(), 8);
        assert!(svg.contains(PIN_COLOR));
    }

    #[test]
    fn one_line_per_connection_grouped_by_tier() {
        let connections = vec![
            Connection {
                from: 0,
                to: 4,
                score: 1.0,
            },
            Connection {
                from: 4,
                to: 1,
                score: 0.1,
            },
            Connection {
                from: 1,
                to: 5,
                score: 0.1,
            },
        ];
        let svg = to_svg(&result_with(connections), 0.5, &SvgMetadata::default());
        assert_eq!(svg.matches("<line").count(), 3);
        // Two tiers present: low and high.
        assert_eq!(svg.matches("stroke-opacity").count(), 2);
        assert!(svg.contains(r#"stroke-opacity="0.15""#));
        assert!(svg.contains(r#"stroke-opacity="0.45""#));
        let low = svg.find(r#"stroke-width="0.5""#).unwrap();
        let high = svg.find(r#"stroke-width="0.9""#).unwrap();
        assert!(low < high, "low tier must be drawn first");
    }

    #[test]
    fn dangling_pin_references_are_skipped() {
        let connections = vec![Connection {
            from: 0,
            to: 99,
            score: 1.0,
        }];
        let svg = to_svg(&result_with(connections), 0.3, &SvgMetadata::default());
        assert_eq!(svg.matches("<line").count(), 0);
    }

    #[test]
    fn metadata_is_escaped() {
        let metadata = SvgMetadata {
            title: Some("cats & dogs"),
            description: Some("pins=8 <test>"),
        };
        let svg = to_svg(&result_with(Vec::new()), 0.3, &metadata);
        assert!(svg.contains("<title>cats &amp; dogs</title>"));
        assert!(svg.contains("pins=8 &lt;test&gt;"));
    }
}
