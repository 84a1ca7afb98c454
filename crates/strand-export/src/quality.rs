//! Quality tiers for rendering connections.
//!
//! Renderers draw strong, early connections darker and wider than weak
//! or late ones. Each connection's score is discounted by up to 30% along
//! the winding order and bucketed into one of three tiers, which are
//! drawn lowest first so the strongest lines end up on top.

use strand_pipeline::Connection;

/// Score above which a connection is [`QualityTier::High`].
pub const HIGH_THRESHOLD: f64 = 0.7;
/// Score above which a connection is at least [`QualityTier::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 0.4;
/// Largest discount applied to the last connection in the sequence.
pub const ORDER_DISCOUNT: f64 = 0.3;
/// Score assumed for a connection whose score is zero or NaN.
pub const FALLBACK_SCORE: f64 = 0.5;

/// Rendering tier of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Tiers in drawing order.
    pub const DRAW_ORDER: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Multiplier applied to the base line opacity.
    #[must_use]
    pub const fn opacity_factor(self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Medium => 0.6,
            Self::High => 0.9,
        }
    }

    /// Stroke width in canvas pixels.
    #[must_use]
    pub const fn stroke_width(self) -> f64 {
        match self {
            Self::Low => 0.5,
            Self::Medium => 0.7,
            Self::High => 0.9,
        }
    }
}

/// Tier of the connection at `index` in a sequence of `len`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classify(connection: &Connection, index: usize, len: usize) -> QualityTier {
    let score = if connection.score == 0.0 || connection.score.is_nan() {
        FALLBACK_SCORE
    } else {
        connection.score
    };
    let order_factor = 1.0 - (index as f64 / len.max(1) as f64) * ORDER_DISCOUNT;
    let adjusted = score * order_factor;
    if adjusted > HIGH_THRESHOLD {
        QualityTier::High
    } else if adjusted > MEDIUM_THRESHOLD {
        QualityTier::Medium
    } else {
        QualityTier::Low
    }
}

/// Connections grouped by tier, each group in sequence order.
#[must_use]
pub fn group_by_tier(connections: &[Connection]) -> [(QualityTier, Vec<&Connection>); 3] {
    let mut groups = QualityTier::DRAW_ORDER.map(|tier| (tier, Vec::new()));
    let len = connections.len();
    for (i, c) in connections.iter().enumerate() {
        let tier = classify(c, i, len);
        if let Some((_, group)) = groups.iter_mut().find(|(t, _)| *t == tier) {
            group.push(c);
        }
    }
    groups
}

/// Per-tier connection counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualitySummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl QualitySummary {
    /// Total connections counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    /// Share of high-tier connections as a whole percentage. Zero for an
    /// empty sequence.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn high_percent(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (self.high as f64 / total as f64 * 100.0).round() as u32
    }
}

/// Count connections per tier.
#[must_use]
pub fn quality_summary(connections: &[Connection]) -> QualitySummary {
    let len = connections.len();
    let mut summary = QualitySummary::default();
    for (i, c) in connections.iter().enumerate() {
        match classify(c, i, len) {
            QualityTier::High => summary.high += 1,
            QualityTier::Medium => summary.medium += 1,
            QualityTier::Low => summary.low += 1,
        }
    }
    summary
}
