//! Plain-text assembly instructions.
//!
//! Lists the materials, the board preparation steps, and every thread
//! connection in winding order. Pins are numbered from 1 in the text,
//! matching how a physical board is labelled, while the pipeline uses
//! 0-based ids.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use strand_pipeline::StringArtResult;

/// Canvas pixels per centimetre of board diameter.
const PIXELS_PER_CM: f64 = 10.0;

/// Options for [`to_instructions`].
#[derive(Debug, Clone, Default)]
pub struct InstructionsMetadata<'a> {
    /// Heading printed above the instructions, e.g. the source filename.
    pub title: Option<&'a str>,

    /// Only list the first this-many connections. The total count is
    /// always reported.
    pub connection_limit: Option<usize>,
}

/// Suggested board diameter in whole centimetres for a canvas size.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn board_diameter_cm(canvas_size: u32) -> u32 {
    (f64::from(canvas_size) / PIXELS_PER_CM).round() as u32
}

/// Materials list for a board with `pin_count` pins.
#[must_use]
pub fn materials(canvas_size: u32, pin_count: usize) -> Vec<String> {
    vec![
        format!(
            "Circular wooden board or embroidery hoop ({}cm diameter)",
            board_diameter_cm(canvas_size)
        ),
        format!("{pin_count} small nails or pins"),
        "Hammer".to_owned(),
        "Black thread or string (approximately 100-200 meters)".to_owned(),
        "Ruler or measuring tape".to_owned(),
        "Pencil for marking".to_owned(),
        "Printed reference image".to_owned(),
    ]
}

/// Board preparation steps for `pin_count` pins.
#[must_use]
pub fn setup_steps(pin_count: usize) -> Vec<String> {
    vec![
        "Mark the center of your circular board".to_owned(),
        format!("Divide the circumference into {pin_count} equal parts"),
        "Mark each pin position with a pencil".to_owned(),
        "Hammer nails into each marked position, leaving about 5mm exposed".to_owned(),
        format!("Number each nail from 1 to {pin_count}"),
        "Tie the string to nail #1 to begin".to_owned(),
    ]
}

/// One connection as an instruction line (1-based pin numbers).
#[must_use]
pub fn connection_line(index: usize, from: usize, to: usize) -> String {
    format!("{}. From pin {} to pin {}", index + 1, from + 1, to + 1)
}

/// Serialize a result into a plain-text assembly guide.
///
/// # Examples
///
/// ```
/// use strand_export::{InstructionsMetadata, to_instructions};
/// use strand_pipeline::{StringArtConfig, generate};
///
/// let config = StringArtConfig {
///     pin_count: 8,
///     max_connections: 0,
///     canvas_size: 40,
///     ..StringArtConfig::default()
/// };
/// let bitmap = strand_pipeline::RgbaImage::new(40, 40);
/// let result = generate(&bitmap, &config).unwrap();
/// let text = to_instructions(&result, &InstructionsMetadata::default());
/// assert!(text.contains("8 small nails or pins"));
/// assert!(text.contains("Total connections: 0"));
/// ```
#[must_use]
pub fn to_instructions(result: &StringArtResult, metadata: &InstructionsMetadata<'_>) -> String {
    let canvas_size = result.dimensions().width;
    let pin_count = result.pins.len();
    let mut out = String::new();

    let _ = writeln!(out, "STRING ART INSTRUCTIONS");
    if let Some(title) = metadata.title {
        let _ = writeln!(out, "{title}");
    }

    let _ = writeln!(out, "\nMATERIALS NEEDED:");
    write_numbered(&mut out, &materials(canvas_size, pin_count));

    let _ = writeln!(out, "\nSETUP STEPS:");
    write_numbered(&mut out, &setup_steps(pin_count));

    let _ = writeln!(out, "\nSTRING CONNECTIONS:");
    let limit = metadata
        .connection_limit
        .unwrap_or(result.connections.len());
    for (i, c) in result.connections.iter().take(limit).enumerate() {
        let _ = writeln!(out, "{}", connection_line(i, c.from, c.to));
    }
    if limit < result.connections.len() {
        let _ = writeln!(
            out,
            "... {} more connections not shown",
            result.connections.len() - limit
        );
    }

    let _ = writeln!(out, "\nTotal connections: {}", result.connections.len());
    out
}

fn write_numbered(out: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {item}", i + 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strand_pipeline::{
        Connection, DensityField, StringArtResult, TerminationReason, generate_pins,
    };

    use super::*;

    fn result_with(connections: Vec<Connection>) -> StringArtResult {
        StringArtResult {
            pins: generate_pins(12, 400).unwrap(),
            connections,
            density: DensityField::new(400, 400),
            grayscale: DensityField::new(400, 400),
            termination: TerminationReason::MaxConnections,
            iterations: 3,
        }
    }

    fn three_connections() -> Vec<Connection> {
        vec![
            Connection {
                from: 0,
                to: 6,
                score: 0.9,
            },
            Connection {
                from: 6,
                to: 11,
                score: 0.5,
            },
            Connection {
                from: 11,
                to: 4,
                score: 0.2,
            },
        ]
    }

    #[test]
    fn board_size_follows_canvas() {
        assert_eq!(board_diameter_cm(400), 40);
        assert_eq!(board_diameter_cm(255), 26);
    }

    #[test]
    fn connections_are_one_based() {
        let text = to_instructions(&result_with(three_connections()), &InstructionsMetadata::default());
        assert!(text.contains("1. From pin 1 to pin 7"));
        assert!(text.contains("2. From pin 7 to pin 12"));
        assert!(text.contains("3. From pin 12 to pin 5"));
        assert!(text.contains("Total connections: 3"));
    }

    #[test]
    fn sections_appear_in_order() {
        let text = to_instructions(&result_with(three_connections()), &InstructionsMetadata::default());
        let materials = text.find("MATERIALS NEEDED:").unwrap();
        let setup = text.find("SETUP STEPS:").unwrap();
        let connections = text.find("STRING CONNECTIONS:").unwrap();
        assert!(materials < setup && setup < connections);
        assert!(text.contains("40cm diameter"));
        assert!(text.contains("12 small nails or pins"));
        assert!(text.contains("Number each nail from 1 to 12"));
    }

    #[test]
    fn limit_truncates_listing_but_not_total() {
        let metadata = InstructionsMetadata {
            title: Some("portrait.png"),
            connection_limit: Some(2),
        };
        let text = to_instructions(&result_with(three_connections()), &metadata);
        assert!(text.starts_with("STRING ART INSTRUCTIONS\nportrait.png\n"));
        assert!(text.contains("2. From pin 7 to pin 12"));
        assert!(!text.contains("From pin 12 to pin 5"));
        assert!(text.contains("... 1 more connections not shown"));
        assert!(text.contains("Total connections: 3"));
    }

    #[test]
    fn empty_result_still_lists_materials() {
        let text = to_instructions(&result_with(Vec::new()), &InstructionsMetadata::default());
        assert!(text.contains("Hammer"));
        assert!(!text.contains("From pin"));
        assert!(text.ends_with("Total connections: 0\n"));
    }
}
