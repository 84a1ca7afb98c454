//! Histogram equalization.
//!
//! Spreads the field's tonal distribution over the full `[0, 255]` range
//! by remapping every sample through its cumulative distribution.

use crate::types::DensityField;

/// Number of histogram buckets.
pub const BUCKETS: usize = 256;

/// Build the 256-bucket histogram of a field.
///
/// Samples are clamped to `[0, 255]` and truncated to their integer
/// bucket.
#[must_use]
pub fn histogram(field: &DensityField) -> [u64; BUCKETS] {
    let mut hist = [0u64; BUCKETS];
    for &v in field.as_slice() {
        hist[bucket(v)] += 1;
    }
    hist
}

/// Equalize a field's histogram.
///
/// The cumulative distribution is normalized by the pixel count and
/// scaled to `[0, 255]`, then used as a lookup table for every sample.
/// Output values therefore always lie in `[0, 255]`.
#[must_use = "returns the equalized field"]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn equalize_histogram(field: &DensityField) -> DensityField {
    let total = field.as_slice().len();
    if total == 0 {
        return field.clone();
    }

    let hist = histogram(field);
    let mut lookup = [0.0f32; BUCKETS];
    let mut cumulative = 0u64;
    for (slot, &count) in lookup.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *slot = ((cumulative as f64 / total as f64) * 255.0) as f32;
    }

    field.map(|v| lookup[bucket(v)])
}

/// Bucket index of a sample. NaN lands in bucket 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bucket(v: f32) -> usize {
    v.clamp(0.0, 255.0).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_every_sample() {
        let field = DensityField::from_fn(10, 10, |x, _| x as f32 * 20.0);
        let hist = histogram(&field);
        assert_eq!(hist.iter().sum::<u64>(), 100);
        assert_eq!(hist[0], 10);
        assert_eq!(hist[180], 10);
    }

    #[test]
    fn histogram_clamps_out_of_range_samples() {
        let field = DensityField::from_fn(4, 1, |x, _| match x {
            0 => -20.0,
            1 => 12.9,
            2 => 255.0,
            _ => 900.0,
        });
        let hist = histogram(&field);
        assert_eq!(hist[0], 1);
        assert_eq!(hist[12], 1);
        assert_eq!(hist[255], 2);
    }

    #[test]
    fn output_lies_in_byte_range() {
        let field =
            DensityField::from_fn(32, 32, |x, y| (x as f32).mul_add(13.7, 40.0) - y as f32 * 5.1);
        let out = equalize_histogram(&field);
        for &v in out.as_slice() {
            assert!((0.0..=255.0).contains(&v), "value {v} out of range");
        }
    }

    #[test]
    fn brightest_bucket_maps_to_full_scale() {
        let field = DensityField::from_fn(8, 8, |x, y| ((x + y) * 10) as f32);
        let out = equalize_histogram(&field);
        let brightest = out.as_slice().iter().copied().fold(f32::MIN, f32::max);
        assert!((brightest - 255.0).abs() < 1e-3);
    }

    #[test]
    fn equalization_preserves_ordering() {
        let field = DensityField::from_fn(16, 1, |x, _| (x * x) as f32);
        let out = equalize_histogram(&field);
        for x in 1..16 {
            assert!(out.get(x, 0) >= out.get(x - 1, 0));
        }
    }

    #[test]
    fn two_level_image_splits_evenly() {
        let field = DensityField::from_fn(4, 1, |x, _| if x < 2 { 10.0 } else { 200.0 });
        let out = equalize_histogram(&field);
        assert!((out.get(0, 0) - 127.5).abs() < 1e-3);
        assert!((out.get(3, 0) - 255.0).abs() < 1e-3);
    }
}
