pub mod detectors;
pub mod io;
pub mod metrics;
pub mod profile;
pub mod signal;
pub mod source;
pub mod window;

pub use detectors::peaks::{adaptive_threshold, detect_peaks};
pub use metrics::rate::{estimate_rate, rmssd_ms, MetricsFrame};
pub use profile::{Analysis, AnalysisProfile, SignalKind};
pub use signal::*;
pub use source::SampleSource;
pub use window::SampleWindow;
