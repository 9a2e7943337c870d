use serde::{Deserialize, Serialize};

/// Point events on a timeline (e.g., R-peaks or breath maxima), ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inter-event intervals (seconds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervalSeries {
    pub intervals: Vec<f64>,
}

impl IntervalSeries {
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let intervals = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs)
            .collect();
        Self { intervals }
    }

    /// Keep only intervals strictly inside `(lo, hi)`.
    pub fn retain_plausible(&self, bounds: IntervalBounds) -> Self {
        let intervals = self
            .intervals
            .iter()
            .copied()
            .filter(|&dt| bounds.contains(dt))
            .collect();
        Self { intervals }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
    pub fn mean(&self) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }
        self.intervals.iter().sum::<f64>() / self.intervals.len() as f64
    }
}

/// Physiologically plausible interval range in seconds, exclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalBounds {
    pub lo: f64,
    pub hi: f64,
}

impl IntervalBounds {
    pub const CARDIAC: IntervalBounds = IntervalBounds { lo: 0.3, hi: 2.0 };
    pub const RESPIRATORY: IntervalBounds = IntervalBounds { lo: 1.0, hi: 10.0 };

    pub fn contains(&self, dt: f64) -> bool {
        dt > self.lo && dt < self.hi
    }
}
