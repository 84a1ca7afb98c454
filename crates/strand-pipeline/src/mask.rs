//! Circular mask with a soft inner falloff.
//!
//! Pins sit on a circle, so nothing outside it can ever be covered by
//! thread. The mask zeroes that region and ramps values down near the
//! rim so the density field does not end in a hard step.

use crate::types::{DensityField, Point};

/// How far inside the mask radius the falloff ramp reaches full value,
/// in addition to the configured falloff width.
pub const FALLOFF_INSET: f64 = 10.0;

/// Mask radius for a field of the given size.
///
/// The circle is centred on `(width / 2, height / 2)` and sits `margin`
/// pixels inside the shorter side.
#[must_use]
pub fn mask_radius(width: u32, height: u32, margin: f64) -> f64 {
    f64::from(width.min(height)) / 2.0 - margin
}

/// Apply the circular mask.
///
/// Pixels farther than [`mask_radius`] from the centre become zero.
/// Inside, each value is multiplied by
/// `clamp((radius - distance + FALLOFF_INSET) / falloff, 0, 1)`.
/// Distances are measured from integer pixel coordinates.
#[must_use = "returns the masked field"]
#[allow(clippy::cast_possible_truncation)]
pub fn apply_circular_mask(field: &DensityField, margin: f64, falloff: f64) -> DensityField {
    let (w, h) = (field.width(), field.height());
    let radius = mask_radius(w, h, margin);
    let center = Point::new(f64::from(w) / 2.0, f64::from(h) / 2.0);

    DensityField::from_fn(w, h, |x, y| {
        let distance = Point::new(f64::from(x), f64::from(y)).distance(center);
        if distance > radius {
            return 0.0;
        }
        let weight = ((radius - distance + FALLOFF_INSET) / falloff).clamp(0.0, 1.0);
        (f64::from(field.get(x, y)) * weight) as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_uses_shorter_side() {
        assert!((mask_radius(100, 100, 15.0) - 35.0).abs() < f64::EPSILON);
        assert!((mask_radius(200, 80, 15.0) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn outside_radius_is_exactly_zero() {
        let field = DensityField::from_pixel(100, 100, 200.0);
        let masked = apply_circular_mask(&field, 15.0, 25.0);
        let radius = mask_radius(100, 100, 15.0);
        for y in 0..100u32 {
            for x in 0..100u32 {
                let dx = f64::from(x) - 50.0;
                let dy = f64::from(y) - 50.0;
                if dx.hypot(dy) > radius {
                    assert!(
                        masked.get(x, y) == 0.0,
                        "pixel ({x},{y}) outside radius is {}",
                        masked.get(x, y),
                    );
                }
            }
        }
    }

    #[test]
    fn center_keeps_full_value() {
        let field = DensityField::from_pixel(100, 100, 200.0);
        let masked = apply_circular_mask(&field, 15.0, 25.0);
        assert!((masked.get(50, 50) - 200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rim_is_attenuated() {
        // Radius 35: at distance 34 the weight is (35 - 34 + 10) / 25.
        let field = DensityField::from_pixel(100, 100, 100.0);
        let masked = apply_circular_mask(&field, 15.0, 25.0);
        let expected = 100.0 * (11.0 / 25.0);
        assert!(
            (masked.get(84, 50) - expected).abs() < 1e-3,
            "expected {expected}, got {}",
            masked.get(84, 50),
        );
    }

    #[test]
    fn falloff_is_monotonic_toward_rim() {
        let field = DensityField::from_pixel(100, 100, 100.0);
        let masked = apply_circular_mask(&field, 15.0, 25.0);
        for x in 50..85 {
            assert!(masked.get(x + 1, 50) <= masked.get(x, 50));
        }
    }

    #[test]
    fn canvas_smaller_than_margin_is_fully_masked() {
        let field = DensityField::from_pixel(20, 20, 50.0);
        let masked = apply_circular_mask(&field, 15.0, 25.0);
        assert!(masked.as_slice().iter().all(|&v| v == 0.0));
    }
}
