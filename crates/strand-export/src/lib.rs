//! strand-export: Pure format serializers (sans-IO)
//!
//! Converts a string art result into output formats: plain-text
//! assembly instructions and SVG. The [`quality`] tiers are shared with
//! raster renderers so every output draws connections the same way.

pub mod instructions;
pub mod quality;
pub mod svg;

pub use instructions::{InstructionsMetadata, to_instructions};
pub use quality::{QualitySummary, QualityTier, quality_summary};
pub use svg::{SvgMetadata, to_svg};
