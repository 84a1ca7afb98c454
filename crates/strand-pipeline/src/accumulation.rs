//! Running thread coverage.
//!
//! The optimizer owns one [`AccumulationBuffer`] per run. Every accepted
//! connection is rasterized into it, and line scoring reads it back to
//! penalize regions that already carry thread.

use serde::{Deserialize, Serialize};

use crate::types::{DensityField, Dimensions, Point};

/// Largest coverage a cell can hold.
pub const MAX_COVERAGE: f32 = 255.0;

/// Round half toward positive infinity, matching canvas pixel snapping.
#[must_use]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Snap a canvas point to integer pixel coordinates.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn snap(p: Point) -> (i64, i64) {
    (round_half_up(p.x) as i64, round_half_up(p.y) as i64)
}

/// Coverage grid with the same dimensions as the density field.
///
/// Starts at zero. Cells only ever grow and saturate at [`MAX_COVERAGE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulationBuffer {
    cells: DensityField,
}

impl AccumulationBuffer {
    /// Zeroed buffer of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            cells: DensityField::new(width, height),
        }
    }

    /// Zeroed buffer matching `field`'s dimensions.
    #[must_use]
    pub fn matching(field: &DensityField) -> Self {
        Self::new(field.width(), field.height())
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.cells.dimensions()
    }

    /// Coverage at a cell, or `None` outside the buffer.
    #[must_use]
    pub fn coverage_at(&self, x: i64, y: i64) -> Option<f32> {
        self.cells
            .checked_index(x, y)
            .map(|i| self.cells.as_slice()[i])
    }

    /// Read-only view of the coverage grid.
    #[must_use]
    pub const fn as_field(&self) -> &DensityField {
        &self.cells
    }

    /// Consume the buffer, returning the coverage grid.
    #[must_use]
    pub fn into_field(self) -> DensityField {
        self.cells
    }

    /// Add `intensity` to one cell, saturating at [`MAX_COVERAGE`].
    /// Points outside the buffer are ignored.
    #[allow(clippy::cast_possible_truncation)]
    pub fn deposit(&mut self, x: i64, y: i64, intensity: f64) {
        if let Some(i) = self.cells.checked_index(x, y) {
            let cell = &mut self.cells.as_mut_slice()[i];
            *cell = (f64::from(*cell) + intensity).min(f64::from(MAX_COVERAGE)) as f32;
        }
    }

    /// Rasterize the segment `a`-`b`, adding `intensity` to every cell it
    /// passes through.
    ///
    /// The segment is walked in `max(|dx|, |dy|)` equal steps (inclusive
    /// of both endpoints) and each sample is snapped with
    /// [`round_half_up`]. A cell hit by two consecutive samples receives
    /// the intensity twice. Zero-length segments draw nothing.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::suboptimal_flops
    )]
    pub fn draw_line(&mut self, a: Point, b: Point, intensity: f64) {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let steps = dx.abs().max(dy.abs());
        if steps == 0.0 {
            return;
        }

        let x_step = dx / steps;
        let y_step = dy / steps;
        let count = steps.floor() as u64;
        for i in 0..=count {
            let t = i as f64;
            let (x, y) = snap(Point::new(a.x + x_step * t, a.y + y_step * t));
            self.deposit(x, y, intensity);
        }
    }
}
