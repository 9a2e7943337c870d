use crate::{
    detectors::peaks::{adaptive_threshold, detect_peaks},
    metrics::rate::{estimate_rate, MetricsFrame},
    signal::{Events, IntervalBounds},
};
use serde::{Deserialize, Serialize};

/// Which physiological rhythm a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Cardiac,
    Respiratory,
}

/// Detection and estimation parameters for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisProfile {
    /// Threshold = mean + `threshold_k` * stddev of the window.
    pub threshold_k: f64,
    /// Refractory distance between accepted peaks (seconds).
    pub min_distance_s: f64,
    /// Plausible interval range.
    pub bounds: IntervalBounds,
}

impl AnalysisProfile {
    pub fn for_kind(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Cardiac => Self {
                threshold_k: 1.2,
                min_distance_s: 0.35,
                bounds: IntervalBounds::CARDIAC,
            },
            // Breathing amplitude is more uniform and its maxima are gentler.
            SignalKind::Respiratory => Self {
                threshold_k: 0.3,
                min_distance_s: 1.0,
                bounds: IntervalBounds::RESPIRATORY,
            },
        }
    }

    pub fn detect(&self, window: &[f64], sample_rate: f64) -> Events {
        let threshold = adaptive_threshold(window, self.threshold_k);
        detect_peaks(window, sample_rate, self.min_distance_s, threshold)
    }

    /// Threshold, detect and estimate on one window snapshot.
    pub fn analyze(&self, window: &[f64], sample_rate: f64) -> Analysis {
        let events = self.detect(window, sample_rate);
        let frame = estimate_rate(&events, sample_rate, self.bounds);
        log::debug!(
            "analyzed {} samples: {} peaks, rate {:.1}/min, var {:.1} ms",
            window.len(),
            events.len(),
            frame.rate_per_min,
            frame.variability_ms
        );
        Analysis { events, frame }
    }
}

/// Peaks found in a window plus the frame derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub events: Events,
    pub frame: MetricsFrame,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn cardiac_profile_recovers_pulse_rate() {
        let fs = 100.0;
        let period = 0.75;
        let data: Vec<f64> = (0..2000)
            .map(|i| {
                let t = i as f64 / fs;
                let phase = (t % period) - 0.2;
                0.02 * (2.0 * PI * 0.3 * t).sin() + (-0.5 * (phase / 0.012).powi(2)).exp()
            })
            .collect();
        let profile = AnalysisProfile::for_kind(SignalKind::Cardiac);
        let analysis = profile.analyze(&data, fs);
        assert!(analysis.events.len() >= 5);
        let expected = 60.0 / period;
        let rel = (analysis.frame.rate_per_min - expected).abs() / expected;
        assert!(
            rel < 0.02,
            "rate {} vs {}",
            analysis.frame.rate_per_min,
            expected
        );
        assert!(analysis.frame.variability_ms < 15.0);
    }

    #[test]
    fn respiratory_profile_recovers_breathing_rate() {
        let fs = 50.0;
        let br = 15.0;
        let data: Vec<f64> = (0..(fs as usize * 20))
            .map(|i| {
                let phase = 2.0 * PI * (br / 60.0) * i as f64 / fs;
                0.9 * phase.sin() + 0.1 * (2.0 * phase).sin()
            })
            .collect();
        let profile = AnalysisProfile::for_kind(SignalKind::Respiratory);
        let analysis = profile.analyze(&data, fs);
        let rel = (analysis.frame.rate_per_min - br).abs() / br;
        assert!(rel < 0.02, "rate {}", analysis.frame.rate_per_min);
        assert!(analysis.frame.variability_ms < 1e-6);
    }

    #[test]
    fn flat_window_yields_zero_frame() {
        let profile = AnalysisProfile::for_kind(SignalKind::Cardiac);
        let analysis = profile.analyze(&[0.5; 300], 100.0);
        assert!(analysis.events.is_empty());
        assert!(analysis.frame.is_zero());
    }
}
