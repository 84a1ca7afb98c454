//! Power-law contrast enhancement.
//!
//! Stretches the field to its observed range, lifts midtones with a
//! `1 / factor` gamma, and rescales to `[0, 255]`.

use crate::types::DensityField;

/// Stretch and gamma-correct a field.
///
/// Each sample is normalized with the field's own min/max, raised to
/// `1 / factor`, multiplied by 255 and clamped. A field with zero
/// dynamic range (all samples equal) is returned unchanged, since there
/// is nothing to stretch.
///
/// `factor` must be positive; callers validate it through
/// [`FilterConfig::validate`](crate::types::FilterConfig::validate).
///
/// The arithmetic runs in `f64`; only the stored samples are `f32`.
#[must_use = "returns the contrast-enhanced field"]
#[allow(clippy::cast_possible_truncation)]
pub fn enhance_contrast(field: &DensityField, factor: f64) -> DensityField {
    let Some((min, max)) = field.min_max() else {
        return field.clone();
    };
    let (min, max) = (f64::from(min), f64::from(max));
    let range = max - min;
    if range == 0.0 {
        return field.clone();
    }

    let exponent = 1.0 / factor;
    field.map(|v| {
        let normalized = (f64::from(v) - min) / range;
        (normalized.powf(exponent) * 255.0).clamp(0.0, 255.0) as f32
    })
}
