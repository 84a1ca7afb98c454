//! Luminance-weighted grayscale conversion.
//!
//! The first filter stage: RGBA bitmap in, single-channel float field out.
//! Alpha is discarded.

use crate::types::{DensityField, RgbaImage};

/// Red channel luminance weight.
pub const RED_WEIGHT: f64 = 0.299;
/// Green channel luminance weight.
pub const GREEN_WEIGHT: f64 = 0.587;
/// Blue channel luminance weight.
pub const BLUE_WEIGHT: f64 = 0.114;

/// Convert an RGBA bitmap to a grayscale field.
///
/// Uses the standard luminance formula `0.299*R + 0.587*G + 0.114*B`
/// rather than a plain channel average. No rounding is applied, so the
/// output keeps fractional values.
#[must_use = "returns the grayscale field"]
pub fn to_grayscale(bitmap: &RgbaImage) -> DensityField {
    DensityField::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        let [r, g, b, _a] = bitmap.get_pixel(x, y).0;
        luminance(r, g, b)
    })
}

/// Weighted luminance of a single RGB sample.
///
/// Evaluated in `f64` and rounded once to `f32`.
#[must_use]
#[allow(clippy::suboptimal_flops, clippy::cast_possible_truncation)]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    // Unfused: each product rounds before the sum.
    (f64::from(r) * RED_WEIGHT + f64::from(g) * GREEN_WEIGHT + f64::from(b) * BLUE_WEIGHT) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        assert!((RED_WEIGHT + GREEN_WEIGHT + BLUE_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    #[allow(clippy::suboptimal_flops, clippy::cast_possible_truncation)]
    fn luminance_rounds_once_from_f64() {
        let expected = (90.0 * 0.299 + 120.0 * 0.587 + 30.0 * 0.114) as f32;
        assert_eq!(luminance(90, 120, 30), expected);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbaImage::from_fn(17, 31, |_, _| image::Rgba([128, 64, 32, 255]));
        let gray = to_grayscale(&img);
        assert_eq!(gray.width(), 17);
        assert_eq!(gray.height(), 31);
    }

    #[test]
    fn green_is_brightest_channel() {
        let r = luminance(255, 0, 0);
        let g = luminance(0, 255, 0);
        let b = luminance(0, 0, 255);
        assert!(
            g > r && r > b,
            "expected green > red > blue luminance, got R={r} G={g} B={b}",
        );
    }

    #[test]
    fn alpha_is_ignored() {
        let opaque = RgbaImage::from_pixel(1, 1, image::Rgba([90, 120, 30, 255]));
        let clear = RgbaImage::from_pixel(1, 1, image::Rgba([90, 120, 30, 0]));
        assert_eq!(to_grayscale(&opaque), to_grayscale(&clear));
    }

    #[test]
    fn conversion_is_idempotent_on_gray_input() {
        // Feed the converted output back in as an R=G=B bitmap: the
        // weights sum to one, so values must come back unchanged.
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            let v = u8::try_from((x * 16 + y) % 256).unwrap_or(0);
            image::Rgba([v, v, v, 255])
        });
        let once = to_grayscale(&img);
        let again_input = once.to_gray_image();
        let again_rgba = RgbaImage::from_fn(16, 16, |x, y| {
            let v = again_input.get_pixel(x, y).0[0];
            image::Rgba([v, v, v, 255])
        });
        let twice = to_grayscale(&again_rgba);
        for (a, b) in once.as_slice().iter().zip(twice.as_slice()) {
            assert!((a - b).abs() < 1e-3, "expected {a}, got {b}");
        }
    }

    #[test]
    fn white_stays_white() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        for &v in to_grayscale(&img).as_slice() {
            assert!((v - 255.0).abs() < 1e-3);
        }
    }
}
