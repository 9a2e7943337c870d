//! Synthetic cardiac and respiratory waveforms.
//!
//! The underlying rate of every generator keeps moving (bounded random walk or
//! slow sinusoidal wobble) so the downstream variability estimate is exercised.

use super::SampleSource;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::collections::VecDeque;
use std::f64::consts::PI;

/// P, Q, R, S, T components as (amplitude, centre s, width s).
const ECG_WAVES: [(f64, f64, f64); 5] = [
    (0.12, 0.08, 0.015),
    (-0.15, 0.16, 0.010),
    (1.00, 0.18, 0.012),
    (-0.25, 0.20, 0.010),
    (0.35, 0.32, 0.030),
];

/// Beats older than this no longer contribute to the waveform (seconds).
const BEAT_SPAN_S: f64 = 1.0;

/// One heartbeat evaluated `t` seconds after its onset.
pub fn ecg_template(t: f64) -> f64 {
    ECG_WAVES
        .iter()
        .map(|&(amp, mu, sig)| amp * (-0.5 * ((t - mu) / sig).powi(2)).exp())
        .sum()
}

/// Baseline rate doing a clamped random walk plus a slow sinusoidal nudge.
///
/// The walk steps once per call, so its drift speed scales with the sample
/// rate. The nudge is an offset on top of the walked baseline and does not
/// accumulate.
#[derive(Debug, Clone)]
pub struct RateWalk {
    baseline: f64,
    rate: f64,
    step: f64,
    min: f64,
    max: f64,
    nudge_amp: f64,
    nudge_hz: f64,
}

impl RateWalk {
    pub fn new(base: f64, step: f64, min: f64, max: f64, nudge_amp: f64, nudge_hz: f64) -> Self {
        Self {
            baseline: base,
            rate: base,
            step,
            min,
            max,
            nudge_amp,
            nudge_hz,
        }
    }

    /// Heart rate in beats/min: 70 in 45..120, nudged by 0.15 at 0.03 Hz.
    pub fn cardiac() -> Self {
        Self::new(70.0, 0.15, 45.0, 120.0, 0.15, 0.03)
    }

    /// Breathing rate in breaths/min: 12 in 6..25, nudged by 0.03 at 0.02 Hz.
    pub fn respiratory() -> Self {
        Self::new(12.0, 0.03, 6.0, 25.0, 0.03, 0.02)
    }

    /// Rate returned by the last `advance`.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn advance<R: Rng>(&mut self, rng: &mut R, now: f64) -> f64 {
        if self.step > 0.0 {
            self.baseline += rng.gen_range(-self.step..=self.step);
        }
        self.baseline = self.baseline.clamp(self.min, self.max);
        let nudge = self.nudge_amp * (2.0 * PI * self.nudge_hz * now).sin();
        self.rate = (self.baseline + nudge).clamp(self.min, self.max);
        self.rate
    }
}

/// Pulse train of P-QRS-T complexes gated by a drifting heart rate.
pub struct EcgGenerator {
    walk: RateWalk,
    dt: f64,
    beats: VecDeque<f64>,
    next_beat: f64,
    wander_phase: f64,
    noise: f64,
    rng: StdRng,
}

impl EcgGenerator {
    pub fn new(fs: f64, seed: u64) -> Self {
        Self::with_walk(fs, seed, RateWalk::cardiac())
    }

    pub fn with_walk(fs: f64, seed: u64, walk: RateWalk) -> Self {
        Self {
            walk,
            dt: 1.0 / fs,
            beats: VecDeque::new(),
            next_beat: 0.0,
            wander_phase: 0.0,
            noise: 0.03,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Disable the uniform perturbation (baseline wander stays).
    pub fn without_noise(mut self) -> Self {
        self.noise = 0.0;
        self
    }

    /// Current heart rate in beats/min.
    pub fn heart_rate(&self) -> f64 {
        self.walk.rate()
    }
}

impl SampleSource for EcgGenerator {
    fn next_sample(&mut self, now: f64) -> f64 {
        let hr = self.walk.advance(&mut self.rng, now);
        if now >= self.next_beat {
            self.beats.push_back(now);
            self.next_beat = now + 60.0 / hr;
        }
        while self
            .beats
            .front()
            .map_or(false, |&onset| now - onset > BEAT_SPAN_S)
        {
            self.beats.pop_front();
        }

        let mut ecg: f64 = self
            .beats
            .iter()
            .map(|&onset| ecg_template(now - onset))
            .sum();

        self.wander_phase += 2.0 * PI * 0.3 * self.dt;
        ecg += 0.05 * self.wander_phase.sin();
        if self.noise > 0.0 {
            ecg += self.rng.gen_range(-self.noise..=self.noise);
        }
        ecg
    }
}

/// Breathing waveform: fundamental plus a small second harmonic.
pub struct RespirationGenerator {
    walk: RateWalk,
    dt: f64,
    phase: f64,
    noise: f64,
    rng: StdRng,
}

impl RespirationGenerator {
    pub fn new(fs: f64, seed: u64) -> Self {
        Self::with_walk(fs, seed, RateWalk::respiratory())
    }

    pub fn with_walk(fs: f64, seed: u64, walk: RateWalk) -> Self {
        Self {
            walk,
            dt: 1.0 / fs,
            phase: 0.0,
            noise: 0.03,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn without_noise(mut self) -> Self {
        self.noise = 0.0;
        self
    }

    /// Current breathing rate in breaths/min.
    pub fn breathing_rate(&self) -> f64 {
        self.walk.rate()
    }
}

impl SampleSource for RespirationGenerator {
    fn next_sample(&mut self, now: f64) -> f64 {
        let br = self.walk.advance(&mut self.rng, now);
        self.phase += 2.0 * PI * (br / 60.0) * self.dt;
        let mut rsp = 0.9 * self.phase.sin() + 0.1 * (2.0 * self.phase).sin();
        if self.noise > 0.0 {
            rsp += self.rng.gen_range(-self.noise..=self.noise);
        }
        rsp
    }
}

/// Plain sinusoid whose rate wobbles slowly around a target, plus Gaussian noise.
pub struct SineGenerator {
    target: f64,
    wobble: f64,
    wobble_hz: f64,
    amplitude: f64,
    sigma: f64,
    dt: f64,
    phase: f64,
    rng: StdRng,
}

impl SineGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fs: f64,
        seed: u64,
        target: f64,
        wobble: f64,
        wobble_hz: f64,
        amplitude: f64,
        sigma: f64,
    ) -> Self {
        Self {
            target,
            wobble,
            wobble_hz,
            amplitude,
            sigma,
            dt: 1.0 / fs,
            phase: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// ~75 bpm sinus stand-in for ECG.
    pub fn cardiac(fs: f64, seed: u64) -> Self {
        Self::new(fs, seed, 75.0, 6.0, 0.07, 0.8, 0.05)
    }

    /// ~12 breaths/min stand-in for respiration.
    pub fn respiratory(fs: f64, seed: u64) -> Self {
        Self::new(fs, seed, 12.0, 2.0, 0.05, 0.6, 0.02)
    }

    pub fn rate_at(&self, now: f64) -> f64 {
        self.target + self.wobble * (2.0 * PI * self.wobble_hz * now).sin()
    }
}

impl SampleSource for SineGenerator {
    fn next_sample(&mut self, now: f64) -> f64 {
        let freq = self.rate_at(now) / 60.0;
        self.phase += 2.0 * PI * freq * self.dt;
        let noise: f64 = self.rng.sample(StandardNormal);
        self.amplitude * self.phase.sin() + self.sigma * noise
    }
}
