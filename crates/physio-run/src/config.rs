use anyhow::{ensure, Context, Result};
use physio_lib::{AnalysisProfile, IntervalBounds, SignalKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Highest accepted sample rate (Hz).
pub const MAX_SAMPLE_RATE: f64 = 100_000.0;
/// Lowest accepted sample rate (Hz).
pub const MIN_SAMPLE_RATE: f64 = 0.01;
/// Longest accepted analysis or normalization window (seconds).
pub const MAX_WINDOW_S: f64 = 3600.0;
/// Largest window, in samples, a session may hold per channel.
pub const MAX_WINDOW_SAMPLES: f64 = 10_000_000.0;

/// Shape of the synthetic waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    /// P-QRS-T complexes and a two-harmonic breathing curve on drifting rates.
    #[default]
    Pqrst,
    /// Plain sinusoids whose rates wobble around a target.
    Sine,
}

/// Session description as written in a TOML file; every field is optional.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionFile {
    #[serde(default)]
    pub fs: Option<f64>,
    #[serde(default)]
    pub window_s: Option<f64>,
    #[serde(default)]
    pub metrics_period_s: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub waveform: Option<Waveform>,
    #[serde(default)]
    pub cardiac: Option<ProfileOverride>,
    #[serde(default)]
    pub respiratory: Option<ProfileOverride>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProfileOverride {
    #[serde(default)]
    pub threshold_k: Option<f64>,
    #[serde(default)]
    pub min_distance_s: Option<f64>,
    #[serde(default)]
    pub interval_min_s: Option<f64>,
    #[serde(default)]
    pub interval_max_s: Option<f64>,
}

impl ProfileOverride {
    fn apply(&self, base: AnalysisProfile) -> AnalysisProfile {
        AnalysisProfile {
            threshold_k: self.threshold_k.unwrap_or(base.threshold_k),
            min_distance_s: self.min_distance_s.unwrap_or(base.min_distance_s),
            bounds: IntervalBounds {
                lo: self.interval_min_s.unwrap_or(base.bounds.lo),
                hi: self.interval_max_s.unwrap_or(base.bounds.hi),
            },
        }
    }
}

/// Resolved settings for a synthetic session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Raw sample rate (Hz).
    pub fs: f64,
    /// Length of the analysis window (seconds).
    pub window_s: f64,
    /// Metrics cadence (seconds).
    pub metrics_period_s: f64,
    pub seed: u64,
    pub waveform: Waveform,
    pub cardiac: AnalysisProfile,
    pub respiratory: AnalysisProfile,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fs: 100.0,
            window_s: 20.0,
            metrics_period_s: 1.0,
            seed: 0,
            waveform: Waveform::Pqrst,
            cardiac: AnalysisProfile::for_kind(SignalKind::Cardiac),
            respiratory: AnalysisProfile::for_kind(SignalKind::Respiratory),
        }
    }
}

impl SessionConfig {
    pub fn from_file(file: &SessionFile) -> Self {
        let base = Self::default();
        Self {
            fs: file.fs.unwrap_or(base.fs),
            window_s: file.window_s.unwrap_or(base.window_s),
            metrics_period_s: file.metrics_period_s.unwrap_or(base.metrics_period_s),
            seed: file.seed.unwrap_or(base.seed),
            waveform: file.waveform.unwrap_or(base.waveform),
            cardiac: file
                .cardiac
                .as_ref()
                .map_or(base.cardiac, |o| o.apply(base.cardiac)),
            respiratory: file
                .respiratory
                .as_ref()
                .map_or(base.respiratory, |o| o.apply(base.respiratory)),
        }
    }

    pub fn profile(&self, kind: SignalKind) -> AnalysisProfile {
        match kind {
            SignalKind::Cardiac => self.cardiac,
            SignalKind::Respiratory => self.respiratory,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_window(self.fs, self.window_s)?;
        ensure!(
            self.metrics_period_s.is_finite()
                && self.metrics_period_s > 0.0
                && self.metrics_period_s <= MAX_WINDOW_S,
            "metrics period must be in (0, {MAX_WINDOW_S}] s, got {}",
            self.metrics_period_s
        );
        for (name, profile) in [("cardiac", &self.cardiac), ("respiratory", &self.respiratory)] {
            ensure!(
                profile.min_distance_s >= 0.0,
                "{name}: refractory distance must not be negative"
            );
            ensure!(
                profile.bounds.lo < profile.bounds.hi,
                "{name}: interval range {}..{} is empty",
                profile.bounds.lo,
                profile.bounds.hi
            );
        }
        Ok(())
    }
}

/// Check a sample rate and trailing window length before anything is allocated.
pub fn check_window(fs: f64, window_s: f64) -> Result<()> {
    ensure!(
        fs.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&fs),
        "sample rate must be in [{MIN_SAMPLE_RATE}, {MAX_SAMPLE_RATE}] Hz, got {fs}"
    );
    ensure!(
        window_s.is_finite() && window_s > 0.0 && window_s <= MAX_WINDOW_S,
        "window length must be in (0, {MAX_WINDOW_S}] s, got {window_s}"
    );
    ensure!(
        fs * window_s <= MAX_WINDOW_SAMPLES,
        "window of {window_s} s at {fs} Hz exceeds {MAX_WINDOW_SAMPLES} samples"
    );
    Ok(())
}

pub fn read_session(path: &Path) -> Result<SessionFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session {}", path.display()))?;
    let file: SessionFile =
        toml::from_str(&contents).with_context(|| format!("parsing session {}", path.display()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_resolves_to_defaults() {
        let cfg = SessionConfig::from_file(&SessionFile::default());
        assert_eq!(cfg.fs, 100.0);
        assert_eq!(cfg.window_s, 20.0);
        assert_eq!(cfg.metrics_period_s, 1.0);
        assert_eq!(cfg.waveform, Waveform::Pqrst);
        assert_eq!(cfg.cardiac.threshold_k, 1.2);
        assert_eq!(cfg.respiratory.bounds, IntervalBounds::RESPIRATORY);
        cfg.validate().unwrap();
    }

    #[test]
    fn reads_overrides_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(
            &path,
            r#"
fs = 50.0
metrics_period_s = 0.1
waveform = "sine"
seed = 9

[cardiac]
threshold_k = 1.5
interval_max_s = 1.5
"#,
        )
        .unwrap();
        let cfg = SessionConfig::from_file(&read_session(&path).unwrap());
        assert_eq!(cfg.fs, 50.0);
        assert_eq!(cfg.window_s, 20.0);
        assert_eq!(cfg.metrics_period_s, 0.1);
        assert_eq!(cfg.waveform, Waveform::Sine);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.cardiac.threshold_k, 1.5);
        assert_eq!(cfg.cardiac.min_distance_s, 0.35);
        assert_eq!(cfg.cardiac.bounds, IntervalBounds { lo: 0.3, hi: 1.5 });
        assert_eq!(cfg.respiratory.threshold_k, 0.3);
    }

    #[test]
    fn rejects_nonsense_settings() {
        let mut cfg = SessionConfig::default();
        cfg.fs = 0.0;
        assert!(cfg.validate().is_err());
        let mut cfg = SessionConfig::default();
        cfg.respiratory.bounds = IntervalBounds { lo: 5.0, hi: 2.0 };
        assert!(cfg.validate().is_err());
        let mut cfg = SessionConfig::default();
        cfg.fs = 1e-20;
        assert!(cfg.validate().is_err());
        let mut cfg = SessionConfig::default();
        cfg.fs = 1e9;
        assert!(cfg.validate().is_err());
        let mut cfg = SessionConfig::default();
        cfg.window_s = 1e12;
        assert!(cfg.validate().is_err());
        let mut cfg = SessionConfig::default();
        cfg.fs = MAX_SAMPLE_RATE;
        cfg.window_s = MAX_WINDOW_S;
        assert!(cfg.validate().is_err());
        let mut cfg = SessionConfig::default();
        cfg.metrics_period_s = f64::INFINITY;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_session(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("session.toml"));
    }
}
