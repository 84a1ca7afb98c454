//! Run diagnostics: per-stage timings and optimizer counters.
//!
//! Timings go through the [`Clock`] trait so the library never reads the
//! wall clock itself. Binaries supply an `Instant`-backed clock and tests
//! a deterministic one. Timings are reported alongside the result and
//! never feed back into the algorithm.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::{FilterStage, process_staged_observed};
use crate::optimizer::{CancelToken, ConnectionOptimizer, NoProgress, OptimizerConfig};
use crate::types::{
    Dimensions, PipelineError, RgbaImage, StringArtConfig, StringArtResult, TerminationReason,
};

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Wall-clock time of one filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: FilterStage,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Counters from the optimizer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerDiagnostics {
    /// Wall-clock duration of the optimizer run.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Iterations executed (accepted plus stuck).
    pub iterations: usize,
    /// Connections accepted.
    pub accepted: usize,
    /// Iterations that found no acceptable candidate.
    pub stuck_events: usize,
    pub termination: TerminationReason,
}

/// Diagnostics collected from a single [`generate_with_diagnostics`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Canvas size of the run.
    pub dimensions: Dimensions,
    /// Number of pins laid out.
    pub pin_count: usize,
    /// One entry per filter stage, in execution order.
    pub filter_stages: Vec<StageTiming>,
    /// Time spent laying out pins.
    #[serde(with = "duration_serde")]
    pub pin_layout: Duration,
    pub optimizer: OptimizerDiagnostics,
    /// Total wall-clock duration of the run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RunDiagnostics {
    /// Sum of all filter stage durations.
    #[must_use]
    pub fn filter_duration(&self) -> Duration {
        self.filter_stages.iter().map(|s| s.duration).sum()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("String Art Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Canvas: {}x{} ({} pixels), {} pins",
            self.dimensions.width,
            self.dimensions.height,
            self.dimensions.pixel_count(),
            self.pin_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<26} {:>10} {:>10}",
            "Stage", "Duration", "% Total"
        ));
        lines.push("-".repeat(60));

        let total_ms = duration_ms(self.total_duration);
        let percent = |d: Duration| {
            if total_ms > 0.0 {
                duration_ms(d) / total_ms * 100.0
            } else {
                0.0
            }
        };

        for timing in &self.filter_stages {
            let name = timing.stage.label();
            let ms = duration_ms(timing.duration);
            let pct = percent(timing.duration);
            lines.push(format!("{name:<26} {ms:>8.3}ms {pct:>9.1}%"));
        }
        for (name, duration) in [
            ("pin layout", self.pin_layout),
            ("optimizer", self.optimizer.duration),
        ] {
            let ms = duration_ms(duration);
            let pct = percent(duration);
            lines.push(format!("{name:<26} {ms:>8.3}ms {pct:>9.1}%"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Connections: {}  |  Iterations: {}  |  Stuck: {}  |  Stopped: {}",
            self.optimizer.accepted,
            self.optimizer.iterations,
            self.optimizer.stuck_events,
            self.optimizer.termination,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// [`generate`](crate::generate) with timing and counter collection.
///
/// # Errors
///
/// Same as [`generate`](crate::generate).
pub fn generate_with_diagnostics<C: Clock>(
    bitmap: &RgbaImage,
    config: &StringArtConfig,
    clock: &C,
) -> Result<(StringArtResult, RunDiagnostics), PipelineError> {
    crate::validate_input(bitmap, config)?;
    let run_start = clock.now();

    let mut filter_stages = Vec::with_capacity(FilterStage::ALL.len());
    let mut stage_start = clock.now();
    let staged = process_staged_observed(bitmap, &config.filter, |stage| {
        filter_stages.push(StageTiming {
            stage,
            duration: clock.elapsed(&stage_start),
        });
        stage_start = clock.now();
    });
    let filtered = staged.into_output();

    let layout_start = clock.now();
    let pins = crate::pins::generate_pins(config.pin_count, config.canvas_size)?;
    let pin_layout = clock.elapsed(&layout_start);

    let optimizer_start = clock.now();
    let output = ConnectionOptimizer::new(&pins, &filtered.density, OptimizerConfig::from(config))
        .run(&mut NoProgress, &CancelToken::new());
    let optimizer = OptimizerDiagnostics {
        duration: clock.elapsed(&optimizer_start),
        iterations: output.iterations,
        accepted: output.connections.len(),
        stuck_events: output.stuck_events,
        termination: output.termination,
    };

    let diagnostics = RunDiagnostics {
        dimensions: filtered.density.dimensions(),
        pin_count: pins.len(),
        filter_stages,
        pin_layout,
        optimizer,
        total_duration: clock.elapsed(&run_start),
    };
    Ok((crate::assemble(filtered, pins, output), diagnostics))
}
