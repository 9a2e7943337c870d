use crate::signal::{Events, IntervalBounds, IntervalSeries};
use serde::{Deserialize, Serialize};

/// Periodic rate/variability output for one monitored signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsFrame {
    /// Events per minute from the mean plausible interval.
    pub rate_per_min: f64,
    /// RMS of successive interval differences, milliseconds.
    pub variability_ms: f64,
}

impl MetricsFrame {
    pub const ZERO: MetricsFrame = MetricsFrame {
        rate_per_min: 0.0,
        variability_ms: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.rate_per_min == 0.0 && self.variability_ms == 0.0
    }
}

/// Root mean square of successive differences, in milliseconds.
///
/// Returns 0 for fewer than 3 intervals, although two would already give one
/// difference.
pub fn rmssd_ms(intervals: &[f64]) -> f64 {
    if intervals.len() < 3 {
        return 0.0;
    }
    let diffs: Vec<f64> = intervals.windows(2).map(|w| w[1] - w[0]).collect();
    let mean_sq = diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64;
    mean_sq.sqrt() * 1000.0
}

/// Convert ascending peak indices into a rate/variability frame.
///
/// Needs at least 3 peaks and at least 2 intervals inside `bounds`; anything
/// less yields [`MetricsFrame::ZERO`].
pub fn estimate_rate(peaks: &Events, sample_rate: f64, bounds: IntervalBounds) -> MetricsFrame {
    if peaks.len() < 3 || sample_rate <= 0.0 {
        return MetricsFrame::ZERO;
    }
    let plausible = IntervalSeries::from_events(peaks, sample_rate).retain_plausible(bounds);
    if plausible.len() < 2 {
        return MetricsFrame::ZERO;
    }
    MetricsFrame {
        rate_per_min: 60.0 / plausible.mean(),
        variability_ms: rmssd_ms(&plausible.intervals),
    }
}
