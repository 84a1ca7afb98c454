//! strand-pipeline: string art generation (sans-IO).
//!
//! Converts a square RGBA bitmap into an ordered sequence of thread
//! connections between pins on a circle:
//!
//! 1. The [`filter`] chain turns the bitmap into an ink density field
//!    (grayscale -> blur -> contrast -> equalize -> sobel -> thin ->
//!    circular mask -> smoothing -> invert).
//! 2. [`pins`] lays out pins evenly on a circle inscribed in the canvas.
//! 3. The [`optimizer`] greedily picks chords that cover dense regions,
//!    tracking coverage so no region is over-drawn.
//!
//! This crate has **no I/O dependencies** beyond decoding in-memory image
//! bytes ([`canvas`]). Rendering and instruction export live in
//! `strand-export`.

pub mod accumulation;
pub mod blur;
pub mod canvas;
pub mod contrast;
pub mod diagnostics;
pub mod edge;
pub mod equalize;
pub mod filter;
pub mod grayscale;
pub mod mask;
pub mod optimizer;
pub mod pins;
pub mod types;

pub use filter::{FilterOutput, FilterStage, StagedFilters, process, process_staged};
pub use optimizer::{CancelToken, NoProgress, Progress, ProgressObserver};
pub use pins::generate_pins;
pub use types::{
    Connection, DensityField, Dimensions, FilterConfig, GrayImage, LumaField, PinPair, Pin,
    PipelineError, Point, RgbaImage, StringArtConfig, StringArtResult, TerminationReason,
};

use optimizer::{ConnectionOptimizer, OptimizerConfig, OptimizerOutput};

/// Run the full string art pipeline.
///
/// `bitmap` must be `canvas_size x canvas_size`; use
/// [`canvas::fit_to_canvas`] to prepare arbitrary images.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the configuration is
/// invalid or the bitmap does not match the canvas size. Nothing is
/// processed in that case.
pub fn generate(
    bitmap: &RgbaImage,
    config: &StringArtConfig,
) -> Result<StringArtResult, PipelineError> {
    generate_with(bitmap, config, &mut NoProgress, &CancelToken::new())
}

/// [`generate`] with a progress observer and a cancellation token.
///
/// The observer is notified every `config.progress_interval` accepted
/// connections and once at completion. A cancelled run returns the
/// connections accepted so far with [`TerminationReason::Cancelled`].
///
/// # Errors
///
/// Same as [`generate`].
pub fn generate_with(
    bitmap: &RgbaImage,
    config: &StringArtConfig,
    observer: &mut impl ProgressObserver,
    cancel: &CancelToken,
) -> Result<StringArtResult, PipelineError> {
    validate_input(bitmap, config)?;
    tracing::info!(
        pins = config.pin_count,
        max_connections = config.max_connections,
        canvas_size = config.canvas_size,
        "starting string art generation"
    );

    let filtered = filter::process(bitmap, &config.filter);
    let pins = generate_pins(config.pin_count, config.canvas_size)?;
    let output = ConnectionOptimizer::new(&pins, &filtered.density, OptimizerConfig::from(config))
        .run(observer, cancel);
    Ok(assemble(filtered, pins, output))
}

/// Fail fast on a bad configuration or a bitmap of the wrong size.
pub(crate) fn validate_input(
    bitmap: &RgbaImage,
    config: &StringArtConfig,
) -> Result<(), PipelineError> {
    config.validate()?;
    let (w, h) = bitmap.dimensions();
    if w != config.canvas_size || h != config.canvas_size {
        return Err(PipelineError::InvalidConfig(format!(
            "bitmap is {w}x{h}, expected {0}x{0} canvas",
            config.canvas_size
        )));
    }
    Ok(())
}

pub(crate) fn assemble(
    filtered: FilterOutput,
    pins: Vec<Pin>,
    output: OptimizerOutput,
) -> StringArtResult {
    StringArtResult {
        pins,
        connections: output.connections,
        density: filtered.density,
        grayscale: filtered.grayscale,
        termination: output.termination,
        iterations: output.iterations,
    }
}
