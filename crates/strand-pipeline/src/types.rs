//! Shared types for the strand pipeline.

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can render density
/// previews without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage`, the bitmap type accepted by the filter chain.
pub use image::RgbaImage;

/// A 2D point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    #[allow(clippy::suboptimal_flops)]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Single-channel `f32` image, the buffer type behind [`DensityField`].
pub type LumaField = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A single-channel floating-point raster.
///
/// Used both for the filter stages' outputs (values nominally in
/// `[0, 255]`, though some stages transiently exceed that range) and for
/// the optimizer's coverage accumulation.
///
/// Wraps a [`LumaField`] so `imageproc` filters can read it in place.
/// Samples are stored row-major and serialize as
/// `{ width, height, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawField", try_from = "RawField")]
pub struct DensityField {
    image: LumaField,
}

/// Serialized form of a [`DensityField`].
#[derive(Serialize, Deserialize)]
struct RawField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl From<DensityField> for RawField {
    fn from(field: DensityField) -> Self {
        let (width, height) = (field.width(), field.height());
        Self {
            width,
            height,
            data: field.into_raw(),
        }
    }
}

impl TryFrom<RawField> for DensityField {
    type Error = String;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let len = raw.data.len();
        Self::from_raw(raw.width, raw.height, raw.data).ok_or_else(|| {
            format!(
                "field data has {len} samples, expected {}x{}",
                raw.width, raw.height
            )
        })
    }
}

impl From<LumaField> for DensityField {
    fn from(image: LumaField) -> Self {
        Self { image }
    }
}

impl DensityField {
    /// Create a field filled with zeros.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_pixel(width, height, 0.0)
    }

    /// Create a field with every sample set to `value`.
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, value: f32) -> Self {
        Self {
            image: ImageBuffer::from_pixel(width, height, Luma([value])),
        }
    }

    /// Create a field by evaluating `f(x, y)` for every sample.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        Self {
            image: ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)])),
        }
    }

    /// Wrap an existing row-major buffer.
    ///
    /// Returns `None` if `data.len() != width * height`.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        ImageBuffer::from_raw(width, height, data).map(Self::from)
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Width and height as [`Dimensions`].
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.image.dimensions();
        Dimensions { width, height }
    }

    /// The underlying image buffer.
    #[must_use]
    pub const fn as_image(&self) -> &LumaField {
        &self.image
    }

    /// Consume the field and return the underlying image buffer.
    #[must_use]
    pub fn into_image(self) -> LumaField {
        self.image
    }

    /// Row-major sample slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.image
    }

    /// Mutable row-major sample slice.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.image
    }

    /// Consume the field and return the underlying buffer.
    #[must_use]
    pub fn into_raw(self) -> Vec<f32> {
        self.image.into_raw()
    }

    /// Sample at `(x, y)`.
    ///
    /// Callers must pass in-bounds coordinates; out-of-bounds access
    /// yields `0.0` rather than panicking.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.image.get_pixel_checked(x, y).map_or(0.0, |p| p.0[0])
    }

    /// Row-major index of `(x, y)`. Does not bounds-check.
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.image.width() as usize + x as usize
    }

    /// Row-major index of a signed coordinate, or `None` when it falls
    /// outside the field.
    #[must_use]
    pub fn checked_index(&self, x: i64, y: i64) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width())?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height())?;
        Some(self.index(x, y))
    }

    /// Minimum and maximum sample values, or `None` for an empty field.
    #[must_use]
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let first = *self.as_slice().first()?;
        Some(
            self.as_slice()
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// Apply `f` to every sample, producing a new field of the same size.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        let mut image = self.image.clone();
        for v in image.iter_mut() {
            *v = f(*v);
        }
        Self { image }
    }

/// Render the field as an 8-bit grayscale image.
    ///
    /// Samples are rounded and clamped to `[0, 255]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            image::Luma([self.get(x, y).round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// A fixed anchor point on the circle where thread connections terminate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Index in `[0, pin_count)`.
    pub id: usize,
    /// Angle around the circle in radians, measured from +X toward +Y.
    pub angle: f64,
    /// Horizontal canvas coordinate.
    pub x: f64,
    /// Vertical canvas coordinate.
    pub y: f64,
}

impl Pin {
    /// Canvas position of the pin.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An accepted thread between two distinct pins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Pin the thread leaves from.
    pub from: usize,
    /// Pin the thread is wound onto.
    pub to: usize,
    /// Line score at the time the connection was accepted.
    pub score: f64,
}

impl Connection {
    /// The direction-independent pin pair of this connection.
    #[must_use]
    pub fn pair(&self) -> PinPair {
        PinPair::new(self.from, self.to)
    }
}

/// An unordered pair of pin ids, stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinPair {
    low: usize,
    high: usize,
}

impl PinPair {
    /// Normalize `(a, b)` so that `{a, b}` and `{b, a}` compare equal.
    #[must_use]
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// The smaller pin id.
    #[must_use]
    pub const fn low(self) -> usize {
        self.low
    }

    /// The larger pin id.
    #[must_use]
    pub const fn high(self) -> usize {
        self.high
    }
}

/// Parameters for the density filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Gaussian sigma for the noise-reduction blur before edge detection.
    pub blur_sigma: f64,

    /// Gaussian sigma for the final smoothing pass. Smaller than
    /// `blur_sigma` so thinned edges stay recognizable.
    pub smoothing_sigma: f64,

    /// Contrast power factor; the stretched image is raised to
    /// `1 / contrast_factor`.
    pub contrast_factor: f64,

    /// Distance in pixels between the canvas edge and the mask circle.
    pub mask_margin: f64,

    /// Width in pixels of the soft falloff ramp inside the mask circle.
    pub mask_falloff: f64,
}

impl FilterConfig {
    /// Default noise-reduction sigma.
    pub const DEFAULT_BLUR_SIGMA: f64 = 1.2;
    /// Default final smoothing sigma.
    pub const DEFAULT_SMOOTHING_SIGMA: f64 = 0.8;
    /// Default contrast power factor.
    pub const DEFAULT_CONTRAST_FACTOR: f64 = 1.8;
    /// Default mask margin.
    pub const DEFAULT_MASK_MARGIN: f64 = 15.0;
    /// Default mask falloff width.
    pub const DEFAULT_MASK_FALLOFF: f64 = 25.0;

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for non-finite values,
    /// a non-positive contrast factor, or a non-positive falloff width.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fields = [
            ("blur_sigma", self.blur_sigma),
            ("smoothing_sigma", self.smoothing_sigma),
            ("contrast_factor", self.contrast_factor),
            ("mask_margin", self.mask_margin),
            ("mask_falloff", self.mask_falloff),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "{name} must be finite, got {value}"
            )));
        }
        if self.contrast_factor <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "contrast_factor must be positive, got {}",
                self.contrast_factor
            )));
        }
        if self.mask_falloff <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "mask_falloff must be positive, got {}",
                self.mask_falloff
            )));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            smoothing_sigma: Self::DEFAULT_SMOOTHING_SIGMA,
            contrast_factor: Self::DEFAULT_CONTRAST_FACTOR,
            mask_margin: Self::DEFAULT_MASK_MARGIN,
            mask_falloff: Self::DEFAULT_MASK_FALLOFF,
        }
    }
}

/// Configuration for a full string-art run.
///
/// Construct with struct-update syntax over [`Default`] and call
/// [`validate`](Self::validate) (done automatically by
/// [`generate`](crate::generate)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringArtConfig {
    /// Number of pins around the circle. At least 2.
    pub pin_count: usize,

    /// Upper bound on the number of accepted connections.
    pub max_connections: usize,

    /// Opacity of a single thread in `(0, 1]`. Each accepted connection
    /// adds `line_opacity * 255` to the coverage along its path.
    pub line_opacity: f64,

    /// Side length of the square canvas in pixels.
    pub canvas_size: u32,

    /// Emit a progress notification every this many accepted
    /// connections. Zero disables periodic notifications.
    pub progress_interval: usize,

    /// Density filter chain parameters.
    pub filter: FilterConfig,
}

impl StringArtConfig {
    /// Default pin count.
    pub const DEFAULT_PIN_COUNT: usize = 200;
    /// Default connection limit.
    pub const DEFAULT_MAX_CONNECTIONS: usize = 3000;
    /// Default thread opacity.
    pub const DEFAULT_LINE_OPACITY: f64 = 0.3;
    /// Default canvas side length.
    pub const DEFAULT_CANVAS_SIZE: u32 = 400;
    /// Default progress cadence.
    pub const DEFAULT_PROGRESS_INTERVAL: usize = 200;

    /// Check the configuration before any processing happens.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `pin_count < 2`,
    /// `canvas_size == 0`, `line_opacity` is not a finite value in
    /// `(0, 1]`, or the filter parameters are invalid.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.pin_count < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "pin_count must be at least 2, got {}",
                self.pin_count
            )));
        }
        if self.canvas_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "canvas_size must be positive".to_string(),
            ));
        }
        if !(self.line_opacity.is_finite() && self.line_opacity > 0.0 && self.line_opacity <= 1.0)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "line_opacity must be in (0, 1], got {}",
                self.line_opacity
            )));
        }
        self.filter.validate()
    }
}

impl Default for StringArtConfig {
    fn default() -> Self {
        Self {
            pin_count: Self::DEFAULT_PIN_COUNT,
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            line_opacity: Self::DEFAULT_LINE_OPACITY,
            canvas_size: Self::DEFAULT_CANVAS_SIZE,
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
            filter: FilterConfig::default(),
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The sequence reached `max_connections`.
    MaxConnections,
    /// Too many consecutive iterations found no acceptable candidate.
    StuckLimit,
    /// The run used up its `max_connections + STUCK_LIMIT` iteration
    /// budget before either of the other limits was hit.
    IterationBudget,
    /// A [`CancelToken`](crate::optimizer::CancelToken) was triggered.
    Cancelled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxConnections => f.write_str("max connections reached"),
            Self::StuckLimit => f.write_str("stuck limit reached"),
            Self::IterationBudget => f.write_str("iteration budget exhausted"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Output of a full string-art run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringArtResult {
    /// All pins, indexed by id.
    pub pins: Vec<Pin>,
    /// Accepted connections in winding order.
    pub connections: Vec<Connection>,
    /// Final ink density field the optimizer worked against.
    pub density: DensityField,
    /// Grayscale conversion of the input, for previews.
    pub grayscale: DensityField,
    /// Why the optimizer stopped.
    pub termination: TerminationReason,
    /// Optimizer iterations executed (accepted plus stuck).
    pub iterations: usize,
}

impl StringArtResult {
    /// Canvas dimensions of the run.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.density.dimensions()
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Configuration (or input shape) is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pin_pair_is_direction_independent() {
        assert_eq!(PinPair::new(3, 7), PinPair::new(7, 3));
        assert_eq!(PinPair::new(7, 3).low(), 3);
        assert_eq!(PinPair::new(7, 3).high(), 7);
        assert_ne!(PinPair::new(3, 7), PinPair::new(3, 8));
    }

    #[test]
    fn connection_pair_ignores_direction() {
        let forward = Connection {
            from: 1,
            to: 9,
            score: 0.5,
        };
        let backward = Connection {
            from: 9,
            to: 1,
            score: 0.1,
        };
        assert_eq!(forward.pair(), backward.pair());
    }

    #[test]
    fn density_field_from_raw_checks_length() {
        assert!(DensityField::from_raw(2, 2, vec![0.0; 4]).is_some());
        assert!(DensityField::from_raw(2, 2, vec![0.0; 5]).is_none());
    }

    #[test]
    fn density_field_from_fn_is_row_major() {
        let field = DensityField::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(field.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert!((field.get(2, 1) - 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn density_field_out_of_bounds_reads_zero() {
        let field = DensityField::from_pixel(2, 2, 7.0);
        assert!(field.get(2, 0).abs() < f32::EPSILON);
        assert_eq!(field.checked_index(-1, 0), None);
        assert_eq!(field.checked_index(1, 1), Some(3));
        assert_eq!(field.checked_index(1, 2), None);
    }

    #[test]
    fn density_field_shares_storage_with_image() {
        let field = DensityField::from_raw(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let ptr = field.as_slice().as_ptr();
        assert_eq!(field.as_image().dimensions(), (3, 2));
        assert!((field.as_image().get_pixel(2, 1).0[0] - 6.0).abs() < f32::EPSILON);
        let image = field.into_image();
        assert_eq!(image.as_ptr(), ptr);
        assert_eq!(DensityField::from(image).as_slice().as_ptr(), ptr);
    }

    #[test]
    fn density_field_serializes_as_width_height_data() {
        let field = DensityField::from_raw(2, 1, vec![0.5, 255.0]).unwrap();
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(json, r#"{"width":2,"height":1,"data":[0.5,255.0]}"#);
        let back: DensityField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn density_field_rejects_mismatched_data() {
        let err = serde_json::from_str::<DensityField>(r#"{"width":2,"height":2,"data":[1.0]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("1 samples, expected 2x2"));
    }

    #[test]
    fn density_field_min_max() {
        let field = DensityField::from_raw(2, 2, vec![3.0, -1.0, 8.5, 2.0]).unwrap();
        assert_eq!(field.min_max(), Some((-1.0, 8.5)));
        assert_eq!(DensityField::new(0, 0).min_max(), None);
    }

    #[test]
    fn to_gray_image_rounds_and_clamps() {
        let field = DensityField::from_raw(4, 1, vec![-5.0, 12.4, 12.6, 300.0]).unwrap();
        let gray = field.to_gray_image();
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 12, 13, 255]);
    }

    #[test]
    fn config_defaults() {
        let config = StringArtConfig::default();
        assert_eq!(config.pin_count, 200);
        assert_eq!(config.max_connections, 3000);
        assert!((config.line_opacity - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.canvas_size, 400);
        assert!((config.filter.blur_sigma - 1.2).abs() < f64::EPSILON);
        assert!((config.filter.smoothing_sigma - 0.8).abs() < f64::EPSILON);
        assert!((config.filter.contrast_factor - 1.8).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_single_pin() {
        let config = StringArtConfig {
            pin_count: 1,
            ..StringArtConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_canvas() {
        let config = StringArtConfig {
            canvas_size: 0,
            ..StringArtConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_opacity() {
        for opacity in [0.0, -0.1, 1.5, f64::NAN, f64::INFINITY] {
            let config = StringArtConfig {
                line_opacity: opacity,
                ..StringArtConfig::default()
            };
            assert!(
                config.validate().is_err(),
                "opacity {opacity} should be rejected"
            );
        }
    }

    #[test]
    fn validate_accepts_full_opacity_and_zero_connections() {
        let config = StringArtConfig {
            line_opacity: 1.0,
            max_connections: 0,
            ..StringArtConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_finite_filter_values() {
        let config = StringArtConfig {
            filter: FilterConfig {
                blur_sigma: f64::NAN,
                ..FilterConfig::default()
            },
            ..StringArtConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn error_display() {
        let err = PipelineError::InvalidConfig("pin_count must be at least 2, got 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid pipeline configuration: pin_count must be at least 2, got 1",
        );
        assert_eq!(PipelineError::EmptyInput.to_string(), "input image data is empty");
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let config: StringArtConfig =
            serde_json::from_str(r#"{"pin_count": 64, "filter": {"blur_sigma": 2.0}}"#).unwrap();
        assert_eq!(config.pin_count, 64);
        assert_eq!(config.max_connections, StringArtConfig::DEFAULT_MAX_CONNECTIONS);
        assert!((config.filter.blur_sigma - 2.0).abs() < f64::EPSILON);
        assert!(
            (config.filter.contrast_factor - FilterConfig::DEFAULT_CONTRAST_FACTOR).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn termination_reason_display() {
        assert_eq!(TerminationReason::StuckLimit.to_string(), "stuck limit reached");
    }
}
