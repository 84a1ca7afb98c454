//! Sobel edge magnitude and non-maximum suppression.
//!
//! [`sobel`] turns the equalized field into a gradient-magnitude map and
//! [`non_maximum_suppression`] thins it to one-pixel ridges. The Sobel
//! components come from [`imageproc::filter::filter_clamped`] evaluated
//! in `f64`.
//!
//! Unlike a textbook Canny detector, suppression estimates the gradient
//! direction from the *pre-Sobel* field by central differences instead
//! of reusing the Sobel components. This changes which ridges survive,
//! and downstream density depends on it, so it is kept as is.

use image::Luma;
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

use crate::types::DensityField;

/// Horizontal Sobel kernel, row-major.
const SOBEL_X: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];

/// Vertical Sobel kernel, row-major.
const SOBEL_Y: [f64; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// Largest magnitude an edge pixel can hold.
pub const MAX_MAGNITUDE: f32 = 255.0;

/// Quantized gradient direction used to pick comparison neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Angle in `[0, 22.5)` or `[157.5, 180]`.
    Horizontal,
    /// Angle in `[22.5, 67.5)`.
    DiagonalUp,
    /// Angle in `[67.5, 112.5)`.
    Vertical,
    /// Angle in `[112.5, 157.5)`.
    DiagonalDown,
}

impl Direction {
    /// Quantize an angle in degrees, already folded into `[0, 180]`.
    #[must_use]
    pub fn from_degrees(angle: f64) -> Self {
        if (22.5..67.5).contains(&angle) {
            Self::DiagonalUp
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::DiagonalDown
        } else {
            Self::Horizontal
        }
    }

    /// Offsets `(dx, dy)` of the two neighbors a pixel is compared with.
    const fn neighbors(self) -> [(i32, i32); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::DiagonalUp => [(1, -1), (-1, 1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::DiagonalDown => [(-1, -1), (1, 1)],
        }
    }
}

/// Sobel gradient magnitude, clamped to [`MAX_MAGNITUDE`].
///
/// The first and last rows and columns have no full 3x3 neighborhood
/// and stay zero.
#[must_use = "returns the edge magnitude field"]
#[allow(clippy::cast_possible_truncation)]
pub fn sobel(field: &DensityField) -> DensityField {
    let (w, h) = (field.width(), field.height());
    if w < 3 || h < 3 {
        return DensityField::new(w, h);
    }

    let gx: Image<Luma<f64>> = filter_clamped(field.as_image(), Kernel::new(&SOBEL_X, 3, 3));
    let gy: Image<Luma<f64>> = filter_clamped(field.as_image(), Kernel::new(&SOBEL_Y, 3, 3));
    DensityField::from_fn(w, h, |x, y| {
        if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
            return 0.0;
        }
        let magnitude = gx.get_pixel(x, y).0[0].hypot(gy.get_pixel(x, y).0[0]);
        magnitude.min(f64::from(MAX_MAGNITUDE)) as f32
    })
}

/// Gradient direction at an interior pixel of `gradients`, by central
/// differences.
#[must_use]
pub fn gradient_direction(gradients: &DensityField, x: u32, y: u32) -> Direction {
    let gx = f64::from(gradients.get(x + 1, y)) - f64::from(gradients.get(x - 1, y));
    let gy = f64::from(gradients.get(x, y + 1)) - f64::from(gradients.get(x, y - 1));
    let mut angle = gy.atan2(gx) * 180.0 / std::f64::consts::PI;
    if angle < 0.0 {
        angle += 180.0;
    }
    Direction::from_degrees(angle)
}

/// Keep only pixels that are local maxima across the gradient.
///
/// `edges` is the Sobel magnitude map and `gradients` the field it was
/// computed from. A nonzero interior pixel survives when its magnitude is
/// at least that of both neighbors along its quantized direction. Border
/// pixels are zero.
#[must_use = "returns the thinned edge field"]
pub fn non_maximum_suppression(edges: &DensityField, gradients: &DensityField) -> DensityField {
    let (w, h) = (edges.width(), edges.height());
    let mut out = DensityField::new(w, h);
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let current = edges.get(x, y);
            if current == 0.0 {
                continue;
            }

            let direction = gradient_direction(gradients, x, y);
            let is_maximum = direction.neighbors().iter().all(|&(dx, dy)| {
                let nx = x.saturating_add_signed(dx);
                let ny = y.saturating_add_signed(dy);
                current >= edges.get(nx, ny)
            });
            if is_maximum {
                let idx = out.index(x, y);
                out.as_mut_slice()[idx] = current;
            }
        }
    }
    out
}
