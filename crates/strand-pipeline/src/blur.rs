//! Gaussian blur with border replication.
//!
//! Used twice in the filter chain: once for noise reduction before edge
//! detection and once, with a smaller sigma, to soften the thinned edge
//! map before inversion.
//!
//! [`gaussian_kernel`] builds the 1-D taps and
//! [`imageproc::filter::separable_filter_equal`] runs the horizontal and
//! vertical passes, clamping out-of-range coordinates to the nearest
//! pixel. Accumulation happens in `f64` and the result is divided by the
//! 2-D kernel weight, so taps that were rounded to `f32` do not shift the
//! overall brightness.

use image::Luma;
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;
use imageproc::map::map_subpixels;

use crate::types::DensityField;

/// Build a normalized 1-D Gaussian kernel.
///
/// The kernel has `2 * ceil(3 * sigma) + 1` taps centred on the middle
/// one, with `k[i] = exp(-(i - center)^2 / (2 * sigma^2))` scaled so the
/// taps sum to 1. Taps are evaluated in `f64` and stored as `f32`.
///
/// Non-positive or non-finite sigma yields the identity kernel `[1.0]`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return vec![1.0];
    }

    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-(x * x) / two_sigma_sq).exp() as f32
        })
        .collect();

    let sum: f64 = kernel.iter().copied().map(f64::from).sum();
    for k in &mut kernel {
        *k = (f64::from(*k) / sum) as f32;
    }
    kernel
}

/// Blur a field with a Gaussian of the given sigma.
///
/// Non-positive or non-finite sigma returns the field unchanged.
#[must_use = "returns the blurred field"]
#[allow(clippy::cast_possible_truncation)]
pub fn gaussian_blur(field: &DensityField, sigma: f64) -> DensityField {
    if !(sigma.is_finite() && sigma > 0.0) {
        return field.clone();
    }

    let kernel: Vec<f64> = gaussian_kernel(sigma)
        .into_iter()
        .map(f64::from)
        .collect();
    let tap_sum: f64 = kernel.iter().sum();
    let weight = tap_sum * tap_sum;

    let wide: Image<Luma<f64>> = map_subpixels(field.as_image(), f64::from);
    let blurred = separable_filter_equal(&wide, &kernel);
    DensityField::from(map_subpixels(&blurred, |v: f64| (v / weight) as f32))
}
