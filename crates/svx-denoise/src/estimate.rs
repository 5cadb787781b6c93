//! Noise power spectrum estimators
//!
//! Each estimator owns the cross-frame state for exactly one audio stream.
//! Per frame it receives the signal power spectrum and the previous frame's
//! segmental SNR, updates its internal tracker, writes the current noise
//! power spectrum into the caller's buffer and returns its sum.
//!
//! VAD cold-starts its accumulator from zero over the first six frames; the
//! minimum-statistics estimators seed their trackers from the first incoming
//! power spectrum.

use serde::{Deserialize, Serialize};
use svx_dsp::sanitize;

/// Per-stream noise estimation contract.
pub trait NoiseEstimator: Send {
    /// Updates the noise estimate from one frame.
    ///
    /// `signal_ps` and `noise_ps` are `fft_size / 2 + 1` bins; `snr_seg_db`
    /// is the segmental SNR of the previous frame. Returns the sum of the
    /// noise power over all bins.
    fn estimate(&mut self, signal_ps: &[f64], noise_ps: &mut [f64], snr_seg_db: f64) -> f64;

    /// Clears all cross-frame state.
    fn reset(&mut self);
}

/// Selectable estimation algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseEstimatorKind {
    Vad,
    Hirsch,
    Doblinger,
    Mcra,
    Mcra2,
}

impl Default for NoiseEstimatorKind {
    fn default() -> Self {
        Self::Vad
    }
}

impl NoiseEstimatorKind {
    /// Resolves a user-supplied name, `None` for unrecognized input.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vad" => Some(Self::Vad),
            "hirsch" => Some(Self::Hirsch),
            "doblinger" => Some(Self::Doblinger),
            "mcra" => Some(Self::Mcra),
            "mcra2" => Some(Self::Mcra2),
            _ => None,
        }
    }

    /// Human-readable label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vad => "VAD noise estimation",
            Self::Hirsch => "Hirsch noise estimation",
            Self::Doblinger => "Doblinger noise estimation",
            Self::Mcra => "MCRA noise estimation",
            Self::Mcra2 => "MCRA-2 noise estimation",
        }
    }

    /// Builds a fresh per-channel estimator.
    pub fn build(
        &self,
        bins: usize,
        fft_size: usize,
        sample_rate: u32,
    ) -> Box<dyn NoiseEstimator> {
        match self {
            Self::Vad => Box::new(Vad::new(bins)),
            Self::Hirsch => Box::new(Hirsch::new(bins)),
            Self::Doblinger => Box::new(Doblinger::new(bins)),
            Self::Mcra => Box::new(Mcra::new(bins)),
            Self::Mcra2 => Box::new(Mcra2::new(bins, fft_size, sample_rate)),
        }
    }
}

fn write_out(state: &[f64], out: &mut [f64]) -> f64 {
    out.copy_from_slice(state);
    state.iter().sum()
}

// ============ VAD ============

/// Threshold-gated recursive averaging driven by segmental SNR.
pub struct Vad {
    noise_ps: Vec<f64>,
    frame: usize,
}

impl Vad {
    const ABSENT_FRAMES: usize = 6;
    const THRESHOLD_DB: f64 = 3.0;
    const GAIN: f64 = 0.9;

    pub fn new(bins: usize) -> Self {
        Self {
            noise_ps: vec![0.0; bins],
            frame: 0,
        }
    }
}

impl NoiseEstimator for Vad {
    fn estimate(&mut self, signal_ps: &[f64], noise_ps: &mut [f64], snr_seg_db: f64) -> f64 {
        if self.frame < Self::ABSENT_FRAMES {
            // Cold start: average the first frames, assumed speech-absent.
            for (n, &s) in self.noise_ps.iter_mut().zip(signal_ps) {
                *n += s / Self::ABSENT_FRAMES as f64;
            }
        } else if snr_seg_db < Self::THRESHOLD_DB {
            for (n, &s) in self.noise_ps.iter_mut().zip(signal_ps) {
                *n = Self::GAIN * *n + (1.0 - Self::GAIN) * s;
            }
        }

        self.frame += 1;
        write_out(&self.noise_ps, noise_ps)
    }

    fn reset(&mut self) {
        self.noise_ps.fill(0.0);
        self.frame = 0;
    }
}

// ============ Hirsch ============

/// Hirsch weighted-average estimation with an oversubtraction gate.
pub struct Hirsch {
    smoothed: Vec<f64>,
    noise_ps: Vec<f64>,
    frame: usize,
}

impl Hirsch {
    const ALPHA_S: f64 = 0.85;
    const BETA: f64 = 1.5;

    pub fn new(bins: usize) -> Self {
        Self {
            smoothed: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            frame: 0,
        }
    }
}

impl NoiseEstimator for Hirsch {
    fn estimate(&mut self, signal_ps: &[f64], noise_ps: &mut [f64], _snr_seg_db: f64) -> f64 {
        if self.frame == 0 {
            self.smoothed.copy_from_slice(signal_ps);
            self.noise_ps.copy_from_slice(signal_ps);
        } else {
            for k in 0..self.noise_ps.len() {
                self.smoothed[k] =
                    Self::ALPHA_S * self.smoothed[k] + (1.0 - Self::ALPHA_S) * signal_ps[k];
                if self.smoothed[k] < Self::BETA * self.noise_ps[k] {
                    self.noise_ps[k] = Self::ALPHA_S * self.noise_ps[k]
                        + (1.0 - Self::ALPHA_S) * self.smoothed[k];
                }
            }
        }

        self.frame += 1;
        write_out(&self.noise_ps, noise_ps)
    }

    fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.noise_ps.fill(0.0);
        self.frame = 0;
    }
}

// ============ Doblinger ============

/// Doblinger continuous minimum-statistics estimation.
pub struct Doblinger {
    smoothed: Vec<f64>,
    minimum: Vec<f64>,
    frame: usize,
}

impl Doblinger {
    const ALPHA: f64 = 0.7;
    const BETA: f64 = 0.96;
    const GAMMA: f64 = 0.998;

    pub fn new(bins: usize) -> Self {
        Self {
            smoothed: vec![0.0; bins],
            minimum: vec![0.0; bins],
            frame: 0,
        }
    }
}

impl NoiseEstimator for Doblinger {
    fn estimate(&mut self, signal_ps: &[f64], noise_ps: &mut [f64], _snr_seg_db: f64) -> f64 {
        if self.frame == 0 {
            self.smoothed.copy_from_slice(signal_ps);
            self.minimum.copy_from_slice(signal_ps);
        } else {
            for k in 0..self.minimum.len() {
                let prev = self.smoothed[k];
                self.smoothed[k] = Self::ALPHA * prev + (1.0 - Self::ALPHA) * signal_ps[k];
                if self.minimum[k] <= self.smoothed[k] {
                    self.minimum[k] = Self::GAMMA * self.minimum[k]
                        + ((1.0 - Self::GAMMA) / (1.0 - Self::BETA))
                            * (self.smoothed[k] - Self::BETA * prev);
                } else {
                    self.minimum[k] = self.smoothed[k];
                }
            }
        }

        self.frame += 1;
        write_out(&self.minimum, noise_ps)
    }

    fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.minimum.fill(0.0);
        self.frame = 0;
    }
}

// ============ MCRA ============

/// Minimum-controlled recursive averaging (Cohen & Berdugo).
pub struct Mcra {
    smoothed: Vec<f64>,
    minimum: Vec<f64>,
    tmp: Vec<f64>,
    presence: Vec<f64>,
    noise_ps: Vec<f64>,
    frame: usize,
}

impl Mcra {
    const ALPHA_D: f64 = 0.95;
    const ALPHA_S: f64 = 0.8;
    const ALPHA_P: f64 = 0.2;
    const WINDOW: usize = 100;
    const DELTA: f64 = 5.0;

    pub fn new(bins: usize) -> Self {
        Self {
            smoothed: vec![0.0; bins],
            minimum: vec![0.0; bins],
            tmp: vec![0.0; bins],
            presence: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            frame: 0,
        }
    }
}

impl NoiseEstimator for Mcra {
    fn estimate(&mut self, signal_ps: &[f64], noise_ps: &mut [f64], _snr_seg_db: f64) -> f64 {
        if self.frame == 0 {
            self.smoothed.copy_from_slice(signal_ps);
            self.minimum.copy_from_slice(signal_ps);
            self.tmp.copy_from_slice(signal_ps);
            self.noise_ps.copy_from_slice(signal_ps);
        } else {
            let rotate = self.frame % Self::WINDOW == 0;
            for k in 0..self.noise_ps.len() {
                self.smoothed[k] =
                    Self::ALPHA_S * self.smoothed[k] + (1.0 - Self::ALPHA_S) * signal_ps[k];

                if rotate {
                    self.minimum[k] = self.tmp[k].min(self.smoothed[k]);
                    self.tmp[k] = self.smoothed[k];
                } else {
                    self.minimum[k] = self.minimum[k].min(self.smoothed[k]);
                    self.tmp[k] = self.tmp[k].min(self.smoothed[k]);
                }

                let ratio = sanitize(self.smoothed[k] / self.minimum[k]);
                let indicator = if ratio > Self::DELTA { 1.0 } else { 0.0 };
                self.presence[k] =
                    Self::ALPHA_P * self.presence[k] + (1.0 - Self::ALPHA_P) * indicator;

                let alpha = Self::ALPHA_D + (1.0 - Self::ALPHA_D) * self.presence[k];
                self.noise_ps[k] = alpha * self.noise_ps[k] + (1.0 - alpha) * signal_ps[k];
            }
        }

        self.frame += 1;
        write_out(&self.noise_ps, noise_ps)
    }

    fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.minimum.fill(0.0);
        self.tmp.fill(0.0);
        self.presence.fill(0.0);
        self.noise_ps.fill(0.0);
        self.frame = 0;
    }
}

// ============ MCRA-2 ============

/// MCRA variant pairing Doblinger-style continuous minimum tracking with
/// frequency-dependent presence thresholds.
pub struct Mcra2 {
    smoothed: Vec<f64>,
    minimum: Vec<f64>,
    presence: Vec<f64>,
    noise_ps: Vec<f64>,
    delta: Vec<f64>,
    frame: usize,
}

impl Mcra2 {
    const ALPHA_D: f64 = 0.95;
    const ALPHA_P: f64 = 0.2;
    const ALPHA: f64 = 0.7;
    const BETA: f64 = 0.8;
    const GAMMA: f64 = 0.998;

    const DELTA_LOW: f64 = 2.0;
    const DELTA_MID: f64 = 2.0;
    const DELTA_HIGH: f64 = 5.0;

    pub fn new(bins: usize, fft_size: usize, sample_rate: u32) -> Self {
        // Band edges as bin indices; speech below 3 kHz tolerates a lower
        // presence threshold than the upper bands.
        let edge_1k = (1000 * fft_size / sample_rate as usize).min(bins);
        let edge_3k = (3000 * fft_size / sample_rate as usize).min(bins);
        let delta = (0..bins)
            .map(|k| {
                if k < edge_1k {
                    Self::DELTA_LOW
                } else if k < edge_3k {
                    Self::DELTA_MID
                } else {
                    Self::DELTA_HIGH
                }
            })
            .collect();

        Self {
            smoothed: vec![0.0; bins],
            minimum: vec![0.0; bins],
            presence: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            delta,
            frame: 0,
        }
    }
}

impl NoiseEstimator for Mcra2 {
    fn estimate(&mut self, signal_ps: &[f64], noise_ps: &mut [f64], _snr_seg_db: f64) -> f64 {
        if self.frame == 0 {
            self.smoothed.copy_from_slice(signal_ps);
            self.minimum.copy_from_slice(signal_ps);
            self.noise_ps.copy_from_slice(signal_ps);
        } else {
            for k in 0..self.noise_ps.len() {
                let prev = self.smoothed[k];
                self.smoothed[k] = Self::ALPHA * prev + (1.0 - Self::ALPHA) * signal_ps[k];

                if self.minimum[k] <= self.smoothed[k] {
                    self.minimum[k] = Self::GAMMA * self.minimum[k]
                        + ((1.0 - Self::GAMMA) / (1.0 - Self::BETA))
                            * (self.smoothed[k] - Self::BETA * prev);
                } else {
                    self.minimum[k] = self.smoothed[k];
                }

                let ratio = sanitize(self.smoothed[k] / self.minimum[k]);
                let indicator = if ratio > self.delta[k] { 1.0 } else { 0.0 };
                self.presence[k] =
                    Self::ALPHA_P * self.presence[k] + (1.0 - Self::ALPHA_P) * indicator;

                let alpha = Self::ALPHA_D + (1.0 - Self::ALPHA_D) * self.presence[k];
                self.noise_ps[k] = alpha * self.noise_ps[k] + (1.0 - alpha) * signal_ps[k];
            }
        }

        self.frame += 1;
        write_out(&self.noise_ps, noise_ps)
    }

    fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.minimum.fill(0.0);
        self.presence.fill(0.0);
        self.noise_ps.fill(0.0);
        self.frame = 0;
    }
}
