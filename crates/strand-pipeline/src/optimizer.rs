//! Greedy connection optimizer.
//!
//! Starting at pin 0, each iteration scores every unused chord from the
//! current pin to the pins `MIN_OFFSET..search_range` steps further
//! around the circle and accepts the best one if it clears
//! [`ACCEPT_THRESHOLD`]. Accepted chords are rasterized into an
//! [`AccumulationBuffer`] so later candidates crossing the same region
//! score lower. When nothing clears the threshold the optimizer jumps to
//! the pin returned by [`find_best_start`] and counts a stuck iteration.
//!
//! The optimizer is a small state machine. [`ConnectionOptimizer::step`]
//! runs exactly one iteration and reports what happened;
//! [`ConnectionOptimizer::run`] drives it to a terminal state while
//! honoring a [`CancelToken`] and notifying a [`ProgressObserver`].
//!
//! A run ends when the first of these holds:
//!
//! - `max_connections` connections have been accepted,
//! - [`STUCK_LIMIT`] consecutive iterations were stuck,
//! - `max_connections + STUCK_LIMIT` iterations have run,
//! - the cancel token was triggered.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::accumulation::{AccumulationBuffer, MAX_COVERAGE, snap};
use crate::types::{
    Connection, DensityField, Pin, PinPair, Point, StringArtConfig, TerminationReason,
};

/// Smallest pin offset considered from the current pin.
pub const MIN_OFFSET: usize = 5;
/// Upper bound on the candidate offset window.
pub const MAX_SEARCH_RANGE: usize = 150;
/// A candidate must score strictly above this to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 0.05;
/// Consecutive stuck iterations that end the run.
pub const STUCK_LIMIT: usize = 100;
/// Chords shorter than this (in pixels) score zero.
pub const MIN_LINE_LENGTH: f64 = 80.0;
/// A chord is scored from `LINE_SAMPLES + 1` evenly spaced samples.
pub const LINE_SAMPLES: u32 = 60;
/// Cap on the length bonus multiplier.
pub const LENGTH_BONUS_CAP: f64 = 1.3;
/// Length at which the bonus multiplier reaches 1.
pub const LENGTH_BONUS_SCALE: f64 = 250.0;
/// Exponent applied to normalized coverage before penalizing.
pub const COVERAGE_EXPONENT: f64 = 1.5;
/// Fraction of a sample's darkness removed at full coverage.
pub const COVERAGE_PENALTY: f64 = 0.9;
/// Stuck recovery only considers every this-many-th pin.
pub const RECOVERY_STRIDE: usize = 3;

/// Optimizer parameters, a subset of [`StringArtConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Upper bound on accepted connections.
    pub max_connections: usize,
    /// Opacity of one thread; each accepted chord deposits
    /// `line_opacity * 255` coverage.
    pub line_opacity: f64,
    /// Notify the observer every this many accepted connections. Zero
    /// disables periodic notifications.
    pub progress_interval: usize,
}

impl From<&StringArtConfig> for OptimizerConfig {
    fn from(config: &StringArtConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            line_opacity: config.line_opacity,
            progress_interval: config.progress_interval,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::from(&StringArtConfig::default())
    }
}

/// Cooperative cancellation flag, checked by [`ConnectionOptimizer::run`]
/// between iterations.
///
/// Clones share the same flag, so one clone can be handed to another
/// thread and triggered from there.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Snapshot of optimizer progress handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Connections accepted so far.
    pub accepted: usize,
    /// Configured connection limit.
    pub max_connections: usize,
    /// Iterations executed so far.
    pub iterations: usize,
    /// Stuck iterations so far (not reset on acceptance).
    pub stuck_events: usize,
}

/// Receives progress notifications from [`ConnectionOptimizer::run`].
pub trait ProgressObserver {
    /// Called every `progress_interval` accepted connections.
    fn on_progress(&mut self, progress: &Progress);

    /// Called once when the run reaches a terminal state.
    fn on_complete(&mut self, progress: &Progress, reason: TerminationReason) {
        let _ = (progress, reason);
    }
}

impl<F: FnMut(&Progress)> ProgressObserver for F {
    fn on_progress(&mut self, progress: &Progress) {
        self(progress);
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _progress: &Progress) {}
}

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerState {
    /// More iterations may run.
    Searching,
    /// No further iterations will run.
    Terminated(TerminationReason),
}

/// What one call to [`ConnectionOptimizer::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// A connection was accepted and drawn.
    Accepted(Connection),
    /// No candidate cleared the threshold; the current pin moved.
    Stuck {
        /// Pin chosen by stuck recovery.
        relocated_to: usize,
        /// Consecutive stuck iterations including this one.
        stuck_count: usize,
    },
    /// The optimizer is (now) terminal. No iteration ran.
    Terminated(TerminationReason),
}

/// Final state of an optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerOutput {
    /// Accepted connections in winding order.
    pub connections: Vec<Connection>,
    /// Why the run ended.
    pub termination: TerminationReason,
    /// Iterations executed (accepted plus stuck).
    pub iterations: usize,
    /// Total stuck iterations.
    pub stuck_events: usize,
    /// Coverage deposited by the accepted connections.
    pub accumulation: AccumulationBuffer,
}

/// Greedy chord selection over a fixed pin layout and density field.
#[derive(Debug, Clone)]
pub struct ConnectionOptimizer<'a> {
    pins: &'a [Pin],
    density: &'a DensityField,
    config: OptimizerConfig,
    accumulation: AccumulationBuffer,
    used_pairs: HashSet<PinPair>,
    connections: Vec<Connection>,
    current_pin: usize,
    stuck_counter: usize,
    stuck_events: usize,
    iterations: usize,
    state: OptimizerState,
}

impl<'a> ConnectionOptimizer<'a> {
    /// Prepare a run at pin 0 with an empty accumulation buffer.
    #[must_use]
    pub fn new(pins: &'a [Pin], density: &'a DensityField, config: OptimizerConfig) -> Self {
        Self {
            pins,
            density,
            config,
            accumulation: AccumulationBuffer::matching(density),
            used_pairs: HashSet::new(),
            connections: Vec::with_capacity(config.max_connections.min(4096)),
            current_pin: 0,
            stuck_counter: 0,
            stuck_events: 0,
            iterations: 0,
            state: OptimizerState::Searching,
        }
    }

    #[must_use]
    pub const fn state(&self) -> OptimizerState {
        self.state
    }

    /// Connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    #[must_use]
    pub const fn current_pin(&self) -> usize {
        self.current_pin
    }

    /// Consecutive stuck iterations since the last acceptance.
    #[must_use]
    pub const fn stuck_count(&self) -> usize {
        self.stuck_counter
    }

    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub const fn accumulation(&self) -> &AccumulationBuffer {
        &self.accumulation
    }

    /// Current counters as a [`Progress`] snapshot.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            accepted: self.connections.len(),
            max_connections: self.config.max_connections,
            iterations: self.iterations,
            stuck_events: self.stuck_events,
        }
    }

    /// Largest number of iterations a run may execute.
    #[must_use]
    pub const fn iteration_budget(&self) -> usize {
        self.config.max_connections.saturating_add(STUCK_LIMIT)
    }

    /// Force the optimizer into a terminal state. Has no effect if it is
    /// already terminal.
    pub const fn terminate(&mut self, reason: TerminationReason) {
        if let OptimizerState::Searching = self.state {
            self.state = OptimizerState::Terminated(reason);
        }
    }

    /// Run a single iteration.
    ///
    /// Returns [`StepOutcome::Terminated`] without doing any work once a
    /// limit has been reached; every later call returns the same reason.
    pub fn step(&mut self) -> StepOutcome {
        if let Some(reason) = self.check_limits() {
            self.terminate(reason);
        }
        if let OptimizerState::Terminated(reason) = self.state {
            return StepOutcome::Terminated(reason);
        }

        self.iterations += 1;
        match self.best_candidate() {
            Some(connection) if connection.score > ACCEPT_THRESHOLD => {
                self.accept(connection);
                StepOutcome::Accepted(connection)
            }
            _ => {
                self.stuck_counter += 1;
                self.stuck_events += 1;
                self.current_pin = find_best_start(self.pins, self.density, &self.accumulation);
                tracing::debug!(
                    relocated_to = self.current_pin,
                    stuck_count = self.stuck_counter,
                    "no acceptable connection, relocating"
                );
                StepOutcome::Stuck {
                    relocated_to: self.current_pin,
                    stuck_count: self.stuck_counter,
                }
            }
        }
    }

    /// Drive [`step`](Self::step) until the optimizer terminates.
    ///
    /// `cancel` is checked before every iteration. A limit that is already
    /// reached takes precedence, so cancelling on the acceptance that
    /// fills `max_connections` still reports
    /// [`TerminationReason::MaxConnections`]. `observer` is notified every
    /// `progress_interval` accepted connections and once at the end.
    pub fn run(
        mut self,
        observer: &mut impl ProgressObserver,
        cancel: &CancelToken,
    ) -> OptimizerOutput {
        let interval = self.config.progress_interval;
        let reason = loop {
            if cancel.is_cancelled() && self.check_limits().is_none() {
                self.terminate(TerminationReason::Cancelled);
            }
            match self.step() {
                StepOutcome::Accepted(_) => {
                    let accepted = self.connections.len();
                    if interval > 0 && accepted % interval == 0 {
                        let progress = self.progress();
                        tracing::info!(
                            accepted,
                            max_connections = progress.max_connections,
                            iterations = progress.iterations,
                            "generated connections"
                        );
                        observer.on_progress(&progress);
                    }
                }
                StepOutcome::Stuck { .. } => {}
                StepOutcome::Terminated(reason) => break reason,
            }
        };

        let progress = self.progress();
        tracing::info!(
            connections = progress.accepted,
            iterations = progress.iterations,
            stuck_events = progress.stuck_events,
            %reason,
            "string art generation complete"
        );
        observer.on_complete(&progress, reason);
        self.into_output(reason)
    }

    fn into_output(self, termination: TerminationReason) -> OptimizerOutput {
        OptimizerOutput {
            connections: self.connections,
            termination,
            iterations: self.iterations,
            stuck_events: self.stuck_events,
            accumulation: self.accumulation,
        }
    }

    fn check_limits(&self) -> Option<TerminationReason> {
        if self.connections.len() >= self.config.max_connections {
            Some(TerminationReason::MaxConnections)
        } else if self.stuck_counter >= STUCK_LIMIT {
            Some(TerminationReason::StuckLimit)
        } else if self.iterations >= self.iteration_budget() {
            Some(TerminationReason::IterationBudget)
        } else {
            None
        }
    }

    /// Highest-scoring unused chord from the current pin. Ties keep the
    /// smaller offset.
    fn best_candidate(&self) -> Option<Connection> {
        let pin_count = self.pins.len();
        let search_range = (pin_count / 2).min(MAX_SEARCH_RANGE);
        let from = self.pins.get(self.current_pin)?;

        let mut best: Option<Connection> = None;
        for offset in MIN_OFFSET..search_range {
            let to = (self.current_pin + offset) % pin_count;
            if self.used_pairs.contains(&PinPair::new(self.current_pin, to)) {
                continue;
            }
            let Some(target) = self.pins.get(to) else {
                continue;
            };
            let score = score_line(
                from.position(),
                target.position(),
                self.density,
                &self.accumulation,
            );
            if best.is_none_or(|b| score > b.score) {
                best = Some(Connection {
                    from: self.current_pin,
                    to,
                    score,
                });
            }
        }
        best
    }

    fn accept(&mut self, connection: Connection) {
        let intensity = self.config.line_opacity * f64::from(MAX_COVERAGE);
        if let (Some(a), Some(b)) = (self.pins.get(connection.from), self.pins.get(connection.to)) {
            self.accumulation
                .draw_line(a.position(), b.position(), intensity);
        }
        self.used_pairs.insert(connection.pair());
        self.connections.push(connection);
        self.current_pin = connection.to;
        self.stuck_counter = 0;
    }
}

/// Score a chord against the density field and current coverage.
///
/// Chords shorter than [`MIN_LINE_LENGTH`] score zero. Otherwise
/// `LINE_SAMPLES + 1` points are sampled at `t = i / LINE_SAMPLES`,
/// snapped to pixels, and each in-field sample contributes
/// `darkness * (1 - COVERAGE_PENALTY * coverage^COVERAGE_EXPONENT)` with
/// `darkness = density / 255` and `coverage = min(1, acc / 255)`. The
/// mean is multiplied by `min(LENGTH_BONUS_CAP, length / LENGTH_BONUS_SCALE)`.
/// A chord with no sample inside the field scores zero.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn score_line(
    a: Point,
    b: Point,
    density: &DensityField,
    accumulation: &AccumulationBuffer,
) -> f64 {
    let length = a.distance(b);
    if length < MIN_LINE_LENGTH {
        return 0.0;
    }

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut total = 0.0;
    let mut valid = 0u32;
    for i in 0..=LINE_SAMPLES {
        let t = f64::from(i) / f64::from(LINE_SAMPLES);
        let (x, y) = snap(Point::new(a.x + dx * t, a.y + dy * t));
        let Some(idx) = density.checked_index(x, y) else {
            continue;
        };
        let darkness = f64::from(density.as_slice()[idx]) / 255.0;
        let acc = accumulation.coverage_at(x, y).unwrap_or(0.0);
        let coverage = (f64::from(acc) / 255.0).min(1.0);
        let penalty = coverage.powf(COVERAGE_EXPONENT);
        total += darkness * (1.0 - penalty * COVERAGE_PENALTY);
        valid += 1;
    }

    if valid == 0 {
        return 0.0;
    }
    let average = total / f64::from(valid);
    average * (length / LENGTH_BONUS_SCALE).min(LENGTH_BONUS_CAP)
}

/// Stuck-recovery pin choice.
///
/// Considers pins `0, RECOVERY_STRIDE, 2 * RECOVERY_STRIDE, ...` whose
/// snapped position is inside the field and scores each as
/// `density * (1 - coverage / 255)`. The first maximum wins; pin 0 is
/// returned if no considered pin is inside the field.
#[must_use]
pub fn find_best_start(
    pins: &[Pin],
    density: &DensityField,
    accumulation: &AccumulationBuffer,
) -> usize {
    let mut best_pin = 0;
    let mut best_score = -1.0;
    for pin in pins.iter().step_by(RECOVERY_STRIDE) {
        let (x, y) = snap(pin.position());
        let Some(idx) = density.checked_index(x, y) else {
            continue;
        };
        let darkness = f64::from(density.as_slice()[idx]);
        let coverage = f64::from(accumulation.coverage_at(x, y).unwrap_or(0.0));
        let score = darkness * (1.0 - coverage / 255.0);
        if score > best_score {
            best_score = score;
            best_pin = pin.id;
        }
    }
    best_pin
}
