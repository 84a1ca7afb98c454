//! strand: turn an image into a circular string art thread sequence.
//!
//! Reads an image file, stretches it onto the square canvas, runs the
//! filter chain and connection optimizer, and writes any requested
//! outputs: assembly instructions, SVG, the full result as JSON, a PNG
//! preview, and PNG renderings of the density and grayscale fields.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin strand -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG`; `-v` raises the default
//! level from `info` to `debug`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use clap::builder::RangedU64ValueParser;
use strand_export::{InstructionsMetadata, SvgMetadata};
use strand_pipeline::diagnostics::Clock;
use strand_pipeline::{FilterConfig, StringArtConfig, StringArtResult};
use tracing_subscriber::EnvFilter;

/// Generate circular string art from an image.
///
/// Logs a short summary to stderr and writes each requested output
/// file.
#[derive(Parser)]
#[command(name = "strand", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Number of pins around the circle.
    #[arg(long, default_value_t = StringArtConfig::DEFAULT_PIN_COUNT, value_parser = RangedU64ValueParser::<usize>::new().range(2..))]
    pins: usize,

    /// Maximum number of thread connections.
    #[arg(long, default_value_t = StringArtConfig::DEFAULT_MAX_CONNECTIONS)]
    lines: usize,

    /// Opacity of a single thread, in (0, 1].
    #[arg(long, default_value_t = StringArtConfig::DEFAULT_LINE_OPACITY)]
    opacity: f64,

    /// Side length of the square working canvas in pixels.
    #[arg(long, default_value_t = StringArtConfig::DEFAULT_CANVAS_SIZE, value_parser = RangedU64ValueParser::<u32>::new().range(1..))]
    canvas_size: u32,

    /// Gaussian sigma of the noise-reduction blur.
    #[arg(long, default_value_t = FilterConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f64,

    /// Gaussian sigma of the final smoothing pass.
    #[arg(long, default_value_t = FilterConfig::DEFAULT_SMOOTHING_SIGMA)]
    smoothing_sigma: f64,

    /// Contrast power factor.
    #[arg(long, default_value_t = FilterConfig::DEFAULT_CONTRAST_FACTOR)]
    contrast: f64,

    /// Full configuration as a JSON string.
    ///
    /// When provided, all other generation flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Write plain-text assembly instructions to this file.
    #[arg(long)]
    instructions: Option<PathBuf>,

    /// Only list the first N connections in the instructions.
    #[arg(long)]
    instructions_limit: Option<usize>,

    /// Write an SVG rendering to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the full result as JSON to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write a PNG preview of the thread rendering to this file.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Write the density field as a grayscale PNG to this file.
    #[arg(long)]
    density: Option<PathBuf>,

    /// Write the grayscale conversion of the input as PNG to this file.
    #[arg(long)]
    grayscale: Option<PathBuf>,

    /// Print per-stage timings and optimizer counters to stdout.
    #[arg(long)]
    diagnostics: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Build a [`StringArtConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<StringArtConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(StringArtConfig {
        pin_count: cli.pins,
        max_connections: cli.lines,
        line_opacity: cli.opacity,
        canvas_size: cli.canvas_size,
        filter: FilterConfig {
            blur_sigma: cli.blur_sigma,
            smoothing_sigma: cli.smoothing_sigma,
            contrast_factor: cli.contrast,
            ..FilterConfig::default()
        },
        ..StringArtConfig::default()
    })
}

/// Install a stderr `fmt` subscriber. `RUST_LOG` overrides `verbose`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second initialization only happens in tests; keep the first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    config.validate().map_err(|e| e.to_string())?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    tracing::info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        "read input image"
    );

    let bitmap = strand_pipeline::canvas::decode_to_canvas(&image_bytes, config.canvas_size)
        .map_err(|e| format!("Pipeline error: {e}"))?;

    let result = if cli.diagnostics {
        let (result, diagnostics) =
            strand_pipeline::diagnostics::generate_with_diagnostics(&bitmap, &config, &StdClock)
                .map_err(|e| format!("Pipeline error: {e}"))?;
        println!("{}", diagnostics.report());
        result
    } else {
        strand_pipeline::generate(&bitmap, &config).map_err(|e| format!("Pipeline error: {e}"))?
    };

    let quality = strand_export::quality_summary(&result.connections);
    tracing::info!(
        connections = result.connections.len(),
        termination = %result.termination,
        high_quality_percent = quality.high_percent(),
        "generated string art"
    );

    write_outputs(cli, &config, &result)
}

fn write_outputs(cli: &Cli, config: &StringArtConfig, result: &StringArtResult) -> Result<(), String> {
    let title = cli
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("strand");

    if let Some(ref path) = cli.instructions {
        let metadata = InstructionsMetadata {
            title: Some(title),
            connection_limit: cli.instructions_limit,
        };
        write_text(path, &strand_export::to_instructions(result, &metadata), "instructions")?;
    }

    if let Some(ref path) = cli.svg {
        let desc = format!(
            "{} pins, {} connections, opacity {}",
            config.pin_count,
            result.connections.len(),
            config.line_opacity,
        );
        let metadata = SvgMetadata {
            title: Some(title),
            description: Some(&desc),
        };
        write_text(path, &strand_export::to_svg(result, config.line_opacity, &metadata), "SVG")?;
    }

    if let Some(ref path) = cli.json {
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| format!("Error serializing result: {e}"))?;
        write_text(path, &json, "JSON")?;
    }

    if let Some(ref path) = cli.preview {
        let img = render::render_preview(result, config.line_opacity)
            .ok_or_else(|| "Error rendering preview: empty canvas".to_owned())?;
        save_image(&img, path, "preview")?;
    }

    if let Some(ref path) = cli.density {
        save_image(&result.density.to_gray_image(), path, "density")?;
    }

    if let Some(ref path) = cli.grayscale {
        save_image(&result.grayscale.to_gray_image(), path, "grayscale")?;
    }

    Ok(())
}

fn write_text(path: &Path, contents: &str, what: &str) -> Result<(), String> {
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "{what} written");
    Ok(())
}

fn save_image<P, C>(img: &image::ImageBuffer<P, C>, path: &Path, what: &str) -> Result<(), String>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    img.save(path)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), "{what} written");
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["strand", "in.png"]).unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, StringArtConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "strand",
            "in.png",
            "--pins",
            "120",
            "--lines",
            "800",
            "--opacity",
            "0.5",
            "--canvas-size",
            "300",
            "--contrast",
            "2.2",
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.pin_count, 120);
        assert_eq!(config.max_connections, 800);
        assert!((config.line_opacity - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.canvas_size, 300);
        assert!((config.filter.contrast_factor - 2.2).abs() < f64::EPSILON);
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = Cli::try_parse_from([
            "strand",
            "in.png",
            "--pins",
            "120",
            "--config-json",
            r#"{"pin_count": 64}"#,
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.pin_count, 64);
        assert_eq!(config.max_connections, StringArtConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = Cli::try_parse_from(["strand", "in.png", "--config-json", "{"]).unwrap();
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.starts_with("Error parsing --config-json"));
    }

    #[test]
    fn single_pin_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["strand", "in.png", "--pins", "1"]).is_err());
    }

    /// `io::Write` sink shared with a `fmt` subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn written_outputs_are_logged() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();

        let path = std::env::temp_dir().join(format!("strand-cli-{}.txt", std::process::id()));
        tracing::subscriber::with_default(subscriber, || {
            write_text(&path, "0 -> 12\n", "instructions").unwrap();
        });
        std::fs::remove_file(&path).unwrap();

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("INFO"), "{log}");
        assert!(log.contains("instructions written"), "{log}");
        assert!(log.contains("bytes=8"), "{log}");
    }

    #[test]
    fn verbose_flag_counts() {
        let cli = Cli::try_parse_from(["strand", "in.png", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
