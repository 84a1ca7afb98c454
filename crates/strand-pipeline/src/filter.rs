//! The density filter chain.
//!
//! Turns an RGBA bitmap into the ink density field the optimizer
//! approximates:
//!
//! ```text
//! grayscale -> blur -> contrast -> equalize -> sobel ->
//! non-maximum suppression -> circular mask -> smoothing -> invert
//! ```
//!
//! Every stage is a pure function in its own module; this module only
//! sequences them. [`process`] returns the final field plus the grayscale
//! preview, [`process_staged`] keeps every intermediate for inspection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DensityField, FilterConfig, RgbaImage};

/// One step of the filter chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterStage {
    /// Luminance conversion.
    Grayscale,
    /// Noise-reduction Gaussian blur.
    Blur,
    /// Power-law contrast stretch.
    Contrast,
    /// Histogram equalization.
    Equalize,
    /// Sobel gradient magnitude.
    Sobel,
    /// Non-maximum suppression.
    Thin,
    /// Circular mask with falloff.
    Mask,
    /// Final Gaussian smoothing.
    Smooth,
    /// `255 - value`.
    Invert,
}

impl FilterStage {
    /// All stages in execution order.
    pub const ALL: [Self; 9] = [
        Self::Grayscale,
        Self::Blur,
        Self::Contrast,
        Self::Equalize,
        Self::Sobel,
        Self::Thin,
        Self::Mask,
        Self::Smooth,
        Self::Invert,
    ];

    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Blur => "blur",
            Self::Contrast => "contrast",
            Self::Equalize => "equalize",
            Self::Sobel => "sobel",
            Self::Thin => "non-maximum suppression",
            Self::Mask => "circular mask",
            Self::Smooth => "smoothing",
            Self::Invert => "invert",
        }
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of the filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOutput {
    /// Final ink density field.
    pub density: DensityField,
    /// Grayscale conversion of the input, for previews.
    pub grayscale: DensityField,
}

/// Every intermediate field of one filter-chain run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFilters {
    /// Output of [`FilterStage::Grayscale`].
    pub grayscale: DensityField,
    /// Output of [`FilterStage::Blur`].
    pub blurred: DensityField,
    /// Output of [`FilterStage::Contrast`].
    pub contrast: DensityField,
    /// Output of [`FilterStage::Equalize`].
    pub equalized: DensityField,
    /// Output of [`FilterStage::Sobel`].
    pub edges: DensityField,
    /// Output of [`FilterStage::Thin`].
    pub thinned: DensityField,
    /// Output of [`FilterStage::Mask`].
    pub masked: DensityField,
    /// Output of [`FilterStage::Smooth`].
    pub smoothed: DensityField,
    /// Output of [`FilterStage::Invert`], the final density.
    pub density: DensityField,
}

impl StagedFilters {
    /// The field produced by `stage`.
    #[must_use]
    pub const fn stage(&self, stage: FilterStage) -> &DensityField {
        match stage {
            FilterStage::Grayscale => &self.grayscale,
            FilterStage::Blur => &self.blurred,
            FilterStage::Contrast => &self.contrast,
            FilterStage::Equalize => &self.equalized,
            FilterStage::Sobel => &self.edges,
            FilterStage::Thin => &self.thinned,
            FilterStage::Mask => &self.masked,
            FilterStage::Smooth => &self.smoothed,
            FilterStage::Invert => &self.density,
        }
    }

    /// Drop the intermediates, keeping the density and grayscale fields.
    #[must_use]
    pub fn into_output(self) -> FilterOutput {
        FilterOutput {
            density: self.density,
            grayscale: self.grayscale,
        }
    }
}

/// Run the full filter chain.
///
/// Deterministic and side-effect free apart from `tracing` events.
/// The config is assumed valid (see [`FilterConfig::validate`]).
#[must_use = "returns the density field"]
pub fn process(bitmap: &RgbaImage, config: &FilterConfig) -> FilterOutput {
    process_staged(bitmap, config).into_output()
}

/// Run the full filter chain, keeping every intermediate field.
#[must_use = "returns the staged filter outputs"]
pub fn process_staged(bitmap: &RgbaImage, config: &FilterConfig) -> StagedFilters {
    process_staged_observed(bitmap, config, |_| {})
}

/// [`process_staged`] with a hook called after each stage completes.
///
/// Used by diagnostics to timestamp stage boundaries.
pub(crate) fn process_staged_observed(
    bitmap: &RgbaImage,
    config: &FilterConfig,
    mut stage_done: impl FnMut(FilterStage),
) -> StagedFilters {
    let mut done = |stage: FilterStage, field: &DensityField| {
        tracing::debug!(
            stage = stage.label(),
            width = field.width(),
            height = field.height(),
            "filter stage complete"
        );
        stage_done(stage);
    };

    let grayscale = crate::grayscale::to_grayscale(bitmap);
    done(FilterStage::Grayscale, &grayscale);

    let blurred = crate::blur::gaussian_blur(&grayscale, config.blur_sigma);
    done(FilterStage::Blur, &blurred);

    let contrast = crate::contrast::enhance_contrast(&blurred, config.contrast_factor);
    done(FilterStage::Contrast, &contrast);

    let equalized = crate::equalize::equalize_histogram(&contrast);
    done(FilterStage::Equalize, &equalized);

    let edges = crate::edge::sobel(&equalized);
    done(FilterStage::Sobel, &edges);

    let thinned = crate::edge::non_maximum_suppression(&edges, &equalized);
    done(FilterStage::Thin, &thinned);

    let masked = crate::mask::apply_circular_mask(&thinned, config.mask_margin, config.mask_falloff);
    done(FilterStage::Mask, &masked);

    let smoothed = crate::blur::gaussian_blur(&masked, config.smoothing_sigma);
    done(FilterStage::Smooth, &smoothed);

    let density = invert(&smoothed);
    done(FilterStage::Invert, &density);

    StagedFilters {
        grayscale,
        blurred,
        contrast,
        equalized,
        edges,
        thinned,
        masked,
        smoothed,
        density,
    }
}

/// `255 - value` for every sample.
#[must_use = "returns the inverted field"]
pub fn invert(field: &DensityField) -> DensityField {
    field.map(|v| 255.0 - v)
}
