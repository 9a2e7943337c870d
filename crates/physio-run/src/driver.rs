//! Sample/metrics loop: one sample per channel every tick, one metrics frame
//! per channel every metrics period.

use crate::config::{SessionConfig, Waveform};
use crate::outlet::{SampleSink, SinkTarget, StreamDecl};
use crate::record::MetricsRecorder;
use anyhow::{ensure, Context, Result};
use log::{debug, info};
use physio_lib::source::{EcgGenerator, RespirationGenerator, SineGenerator};
use physio_lib::{AnalysisProfile, MetricsFrame, SampleSource, SampleWindow, SignalKind};
use std::future::Future;
use tokio::time::{sleep_until, Duration, Instant};

/// Fixed-period trigger driven by elapsed time.
///
/// Fires when `elapsed >= next_due` and then advances `next_due` by exactly one
/// period, so lateness in one tick does not shift the following schedule.
#[derive(Debug, Clone)]
pub struct MetricsCadence {
    period: f64,
    next_due: f64,
}

impl MetricsCadence {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            next_due: period,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn next_due(&self) -> f64 {
        self.next_due
    }

    pub fn poll(&mut self, elapsed: f64) -> bool {
        if elapsed >= self.next_due {
            self.next_due += self.period;
            true
        } else {
            false
        }
    }
}

/// Status labels for a channel kind: (rate, variability).
pub fn labels_for(kind: SignalKind) -> (&'static str, &'static str) {
    match kind {
        SignalKind::Cardiac => ("HR", "HRV"),
        SignalKind::Respiratory => ("BR", "BRV"),
    }
}

/// One monitored channel: generator, trailing window and raw output stream.
pub struct ChannelState {
    kind: SignalKind,
    source: Box<dyn SampleSource>,
    window: SampleWindow,
    profile: AnalysisProfile,
    sink: Box<dyn SampleSink>,
}

impl ChannelState {
    pub fn new(
        kind: SignalKind,
        source: Box<dyn SampleSource>,
        window: SampleWindow,
        profile: AnalysisProfile,
        sink: Box<dyn SampleSink>,
    ) -> Self {
        Self {
            kind,
            source,
            window,
            profile,
            sink,
        }
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    fn step(&mut self, now: f64) -> Result<f64> {
        let value = self.source.next_sample(now);
        self.sink.push_sample(&[value as f32])?;
        self.window.push(value);
        Ok(value)
    }

    fn metrics(&self, fs: f64) -> MetricsFrame {
        self.profile.analyze(&self.window.snapshot(), fs).frame
    }
}

/// Everything a running session owns. Built once, then driven by `tick`.
pub struct Session {
    fs: f64,
    channels: Vec<ChannelState>,
    metrics_sink: Box<dyn SampleSink>,
    cadence: MetricsCadence,
    recorder: Option<MetricsRecorder>,
    frames_emitted: usize,
}

impl Session {
    pub fn new(
        fs: f64,
        metrics_period_s: f64,
        channels: Vec<ChannelState>,
        metrics_sink: Box<dyn SampleSink>,
    ) -> Result<Self> {
        ensure!(fs > 0.0, "sample rate must be positive, got {fs}");
        ensure!(
            metrics_period_s > 0.0,
            "metrics period must be positive, got {metrics_period_s}"
        );
        ensure!(
            metrics_sink.decl().channel_count == channels.len() * 2,
            "metrics stream {} has {} channel(s) but {} signal(s) are monitored",
            metrics_sink.decl().name,
            metrics_sink.decl().channel_count,
            channels.len()
        );
        Ok(Self {
            fs,
            channels,
            metrics_sink,
            cadence: MetricsCadence::new(metrics_period_s),
            recorder: None,
            frames_emitted: 0,
        })
    }

    pub fn with_recorder(mut self, recorder: MetricsRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    pub fn frames_emitted(&self) -> usize {
        self.frames_emitted
    }

    pub fn labels(&self) -> Vec<(&'static str, &'static str)> {
        self.channels.iter().map(|c| labels_for(c.kind)).collect()
    }

    /// Current frame of every channel, computed from its window.
    pub fn compute_metrics(&self) -> Vec<MetricsFrame> {
        self.channels.iter().map(|c| c.metrics(self.fs)).collect()
    }

    /// Advance one sample tick at `now` seconds since start.
    ///
    /// Returns the frames when this tick also fired the metrics cadence.
    pub fn tick(&mut self, now: f64) -> Result<Option<Vec<MetricsFrame>>> {
        for channel in &mut self.channels {
            channel.step(now)?;
        }
        if !self.cadence.poll(now) {
            return Ok(None);
        }
        let frames = self.compute_metrics();
        let flat: Vec<f32> = frames
            .iter()
            .flat_map(|f| [f.rate_per_min as f32, f.variability_ms as f32])
            .collect();
        self.metrics_sink.push_sample(&flat)?;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.append(now, &frames)?;
        }
        self.frames_emitted += 1;
        debug!("metrics at {now:.2}s: {frames:?}");
        Ok(Some(frames))
    }
}

/// Build the two-signal synthetic session (ECG + respiration + metrics).
pub fn synthetic_session(cfg: &SessionConfig, target: &SinkTarget) -> Result<Session> {
    cfg.validate()?;
    let (ecg, rsp): (Box<dyn SampleSource>, Box<dyn SampleSource>) = match cfg.waveform {
        Waveform::Pqrst => (
            Box::new(EcgGenerator::new(cfg.fs, cfg.seed)),
            Box::new(RespirationGenerator::new(cfg.fs, cfg.seed.wrapping_add(1))),
        ),
        Waveform::Sine => (
            Box::new(SineGenerator::cardiac(cfg.fs, cfg.seed)),
            Box::new(SineGenerator::respiratory(cfg.fs, cfg.seed.wrapping_add(1))),
        ),
    };
    let channels = vec![
        ChannelState::new(
            SignalKind::Cardiac,
            ecg,
            SampleWindow::with_seconds(cfg.fs, cfg.window_s),
            cfg.profile(SignalKind::Cardiac),
            target.open(StreamDecl::ekg_raw(cfg.fs))?,
        ),
        ChannelState::new(
            SignalKind::Respiratory,
            rsp,
            SampleWindow::with_seconds(cfg.fs, cfg.window_s),
            cfg.profile(SignalKind::Respiratory),
            target.open(StreamDecl::rsp_raw(cfg.fs))?,
        ),
    ];
    let metrics = target.open(StreamDecl::metrics(channels.len()))?;
    info!(
        "synthetic session: {:?} waveform, {} Hz, {} s window, metrics every {} s",
        cfg.waveform, cfg.fs, cfg.window_s, cfg.metrics_period_s
    );
    Session::new(cfg.fs, cfg.metrics_period_s, channels, metrics)
}

/// Human-readable status line, e.g. `HR=  71.2 /min | HRV=  18.4 ms | ...`.
pub fn format_status(labels: &[(&str, &str)], frames: &[MetricsFrame]) -> String {
    labels
        .iter()
        .zip(frames)
        .map(|((rate, var), f)| {
            format!(
                "{rate}={:6.1} /min | {var}={:6.1} ms",
                f.rate_per_min, f.variability_ms
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Drive the session on a simulated clock for `duration_s` seconds without
/// sleeping. Returns the number of metrics frames emitted.
pub fn run_offline<C>(session: &mut Session, duration_s: f64, mut on_frames: C) -> Result<usize>
where
    C: FnMut(f64, &[MetricsFrame]),
{
    let ticks = (duration_s * session.fs()).round().max(0.0) as usize;
    for i in 0..ticks {
        let now = i as f64 / session.fs();
        if let Some(frames) = session.tick(now)? {
            on_frames(now, &frames);
        }
    }
    Ok(session.frames_emitted())
}

/// Drive the session against the wall clock until `shutdown` resolves or,
/// when given, `limit_s` seconds have elapsed.
///
/// Each iteration sleeps for what is left of its sample period; overruns are
/// not made up. Returns the number of metrics frames emitted.
pub async fn run_realtime<F, C>(
    session: &mut Session,
    limit_s: Option<f64>,
    shutdown: F,
    mut on_frames: C,
) -> Result<usize>
where
    F: Future,
    C: FnMut(f64, &[MetricsFrame]),
{
    tokio::pin!(shutdown);
    let fs = session.fs();
    let period = Duration::try_from_secs_f64(1.0 / fs)
        .with_context(|| format!("sample rate {fs} Hz has no usable tick period"))?;
    let start = Instant::now();
    loop {
        let tick_start = Instant::now();
        let now = tick_start.duration_since(start).as_secs_f64();
        if limit_s.map_or(false, |limit| now >= limit) {
            break;
        }
        if let Some(frames) = session.tick(now)? {
            on_frames(now, &frames);
        }
        tokio::select! {
            _ = &mut shutdown => break,
            _ = sleep_until(tick_start + period) => {}
        }
    }
    Ok(session.frames_emitted())
}
