//! Spectral suppressors
//!
//! Every suppressor runs the same per-frame skeleton: forward FFT, magnitude
//! and phase extraction, in-place power spectrum, noise estimate, segmental
//! SNR, an algorithm-specific spectral gain, resynthesis, inverse FFT. The
//! frame enters and leaves in the time domain; the inverse transform's
//! `fft_size` overscaling is left for the overlap-add driver to divide out.
//!
//! Numeric anomalies (zero noise bins, empty frames) are absorbed locally
//! with [`sanitize`] and the algorithm floors; a frame of silence always
//! comes back as silence.

use serde::{Deserialize, Serialize};
use svx_dsp::bessel::{bessel_i0, bessel_i1};
use svx_dsp::lpc::lpc_coefficients;
use svx_dsp::{power_spectrum, sanitize, DspResult, Frame};

use crate::estimate::NoiseEstimator;

/// Per-channel suppression contract.
pub trait Enhancer: Send {
    /// Enhances one frame in place.
    ///
    /// `frame` holds `datalen` windowed samples zero-padded to the transform
    /// size; `noise` is the estimator owned by the same channel.
    fn process(
        &mut self,
        frame: &mut Frame,
        noise: &mut dyn NoiseEstimator,
        datalen: usize,
    ) -> DspResult<()>;

    /// Clears all cross-frame state.
    fn reset(&mut self);
}

/// Selectable suppression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancerKind {
    SpecSub,
    Mmse,
    WienerAs,
    WienerIter,
    Residual,
}

impl Default for EnhancerKind {
    fn default() -> Self {
        Self::SpecSub
    }
}

impl EnhancerKind {
    /// Resolves a user-supplied name, `None` for unrecognized input.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "specsub" => Some(Self::SpecSub),
            "mmse" => Some(Self::Mmse),
            "wiener-as" => Some(Self::WienerAs),
            "wiener-iter" => Some(Self::WienerIter),
            "residual" => Some(Self::Residual),
            _ => None,
        }
    }

    /// Human-readable label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SpecSub => "Spectral subtraction",
            Self::Mmse => "Minimum mean-square error short-time spectral amplitude",
            Self::WienerAs => "Wiener filter with a priori SNR estimation",
            Self::WienerIter => "Iterative Wiener filter",
            Self::Residual => "Residual noise output",
        }
    }

    /// Builds a fresh per-channel suppressor for a spectrum of `bins` bins.
    pub fn build(&self, bins: usize) -> Box<dyn Enhancer> {
        match self {
            Self::SpecSub => Box::new(SpectralSub::new(bins)),
            Self::Mmse => Box::new(Mmse::new(bins)),
            Self::WienerAs => Box::new(WienerAs::new(bins)),
            Self::WienerIter => Box::new(WienerIter::new(bins)),
            Self::Residual => Box::new(Residual::new(bins)),
        }
    }
}

/// Segmental SNR in dB of one frame.
fn segmental_snr(norm_signal: f64, norm_noise: f64) -> f64 {
    10.0 * sanitize(norm_signal / norm_noise).log10()
}

// ============ Spectral subtraction ============

/// Berouti oversubtraction factor for a power exponent of two.
fn berouti(snr_db: f64) -> f64 {
    if snr_db < -5.0 {
        5.0
    } else if snr_db > 20.0 {
        1.0
    } else {
        4.0 - snr_db * 3.0 / 20.0
    }
}

/// Power spectral subtraction with Berouti oversubtraction and a spectral
/// floor against musical noise.
pub struct SpectralSub {
    power: Vec<f64>,
    phase: Vec<f64>,
    noise_ps: Vec<f64>,
    snr_seg: f64,
}

impl SpectralSub {
    const FLOOR: f64 = 0.002;

    pub fn new(bins: usize) -> Self {
        Self {
            power: vec![0.0; bins],
            phase: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            snr_seg: 0.0,
        }
    }
}

impl Enhancer for SpectralSub {
    fn process(
        &mut self,
        frame: &mut Frame,
        noise: &mut dyn NoiseEstimator,
        _datalen: usize,
    ) -> DspResult<()> {
        frame.forward()?;
        frame.magnitude_into(&mut self.power);
        frame.phase_into(&mut self.phase);

        let norm_ps = power_spectrum(&mut self.power);
        let norm_ns = noise.estimate(&self.power, &mut self.noise_ps, self.snr_seg);
        self.snr_seg = segmental_snr(norm_ps, norm_ns);

        let beta = berouti(self.snr_seg);
        for (p, &n) in self.power.iter_mut().zip(&self.noise_ps) {
            let mut subtracted = *p - beta * n;
            if subtracted - Self::FLOOR * n < 0.0 {
                subtracted = Self::FLOOR * n;
            }
            *p = subtracted.sqrt();
        }

        frame.set_polar(&self.power, &self.phase);
        frame.inverse()
    }

    fn reset(&mut self) {
        self.snr_seg = 0.0;
    }
}

// ============ MMSE-STSA ============

/// Ephraim-Malah MMSE short-time spectral amplitude estimator with a
/// decision-directed a priori SNR and speech-presence uncertainty weighting.
pub struct Mmse {
    power: Vec<f64>,
    phase: Vec<f64>,
    noise_ps: Vec<f64>,
    prev_magnitude_sq: Vec<f64>,
    snr_seg: f64,
    frame: usize,
}

impl Mmse {
    const A_PRIORI: f64 = 0.98;
    const Q_ABSENT: f64 = 0.3;
    const KSI_MIN_EXP: f64 = -2.5;

    pub fn new(bins: usize) -> Self {
        Self {
            power: vec![0.0; bins],
            phase: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            prev_magnitude_sq: vec![0.0; bins],
            snr_seg: 0.0,
            frame: 0,
        }
    }
}

impl Enhancer for Mmse {
    fn process(
        &mut self,
        frame: &mut Frame,
        noise: &mut dyn NoiseEstimator,
        _datalen: usize,
    ) -> DspResult<()> {
        let aa = Self::A_PRIORI;
        let c = std::f64::consts::PI.sqrt() / 2.0;
        let qkr = (1.0 - Self::Q_ABSENT) / Self::Q_ABSENT;
        let ksi_min = 10f64.powf(Self::KSI_MIN_EXP);

        frame.forward()?;
        frame.magnitude_into(&mut self.power);
        frame.phase_into(&mut self.phase);

        let norm_ps = power_spectrum(&mut self.power);
        let norm_ns = noise.estimate(&self.power, &mut self.noise_ps, self.snr_seg);
        self.snr_seg = segmental_snr(norm_ps, norm_ns);

        for k in 0..self.power.len() {
            let gamma_k = sanitize(self.power[k] / self.noise_ps[k]).min(40.0);
            let excess = (gamma_k - 1.0).max(0.0);

            // Decision-directed a priori SNR, limited to -25 dB.
            let ksi = if self.frame == 0 {
                aa + (1.0 - aa) * excess
            } else {
                let dd = sanitize(aa * self.prev_magnitude_sq[k] / self.noise_ps[k])
                    + (1.0 - aa) * excess;
                dd.max(ksi_min)
            };

            let vk = ksi * gamma_k / (1.0 + ksi);
            let j0 = bessel_i0(vk / 2.0);
            let j1 = bessel_i1(vk / 2.0);

            let envelope = (c * vk.sqrt() * (-0.5 * vk).exp()) / gamma_k;
            let gain = sanitize(envelope * ((1.0 + vk) * j0 + vk * j1));

            // Speech presence uncertainty.
            let lambda = qkr * vk.exp() / (1.0 + ksi);
            let p_present = lambda / (1.0 + lambda);

            let magnitude = self.power[k].sqrt() * gain * p_present;
            self.prev_magnitude_sq[k] = magnitude * magnitude;
            self.power[k] = magnitude;
        }

        frame.set_polar(&self.power, &self.phase);
        frame.inverse()?;

        self.frame += 1;
        Ok(())
    }

    fn reset(&mut self) {
        self.prev_magnitude_sq.fill(0.0);
        self.snr_seg = 0.0;
        self.frame = 0;
    }
}

// ============ Decision-directed Wiener ============

/// Wiener gain from a decision-directed a priori SNR estimate.
pub struct WienerAs {
    power: Vec<f64>,
    noise_ps: Vec<f64>,
    posteri: Vec<f64>,
    posteri_prev: Vec<f64>,
    gain: Vec<f64>,
    gain_prev: Vec<f64>,
    snr_seg: f64,
    frame: usize,
}

impl WienerAs {
    const A_DD: f64 = 0.98;

    pub fn new(bins: usize) -> Self {
        Self {
            power: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            posteri: vec![0.0; bins],
            posteri_prev: vec![0.0; bins],
            gain: vec![0.0; bins],
            gain_prev: vec![0.0; bins],
            snr_seg: 0.0,
            frame: 0,
        }
    }
}

impl Enhancer for WienerAs {
    fn process(
        &mut self,
        frame: &mut Frame,
        noise: &mut dyn NoiseEstimator,
        _datalen: usize,
    ) -> DspResult<()> {
        frame.forward()?;
        frame.magnitude_into(&mut self.power);

        let norm_ps = power_spectrum(&mut self.power);
        let norm_ns = noise.estimate(&self.power, &mut self.noise_ps, self.snr_seg);
        self.snr_seg = segmental_snr(norm_ps, norm_ns);

        for k in 0..self.power.len() {
            self.posteri[k] = sanitize(self.power[k] / self.noise_ps[k]);
            let excess = (self.posteri[k] - 1.0).max(0.0);

            let priori = if self.frame == 0 {
                Self::A_DD + (1.0 - Self::A_DD) * excess
            } else {
                Self::A_DD * self.gain_prev[k] * self.gain_prev[k] * self.posteri_prev[k]
                    + (1.0 - Self::A_DD) * excess
            };

            self.gain[k] = (priori / (1.0 + priori)).sqrt();
        }

        frame.apply_gain(&self.gain);
        frame.inverse()?;

        self.gain_prev.copy_from_slice(&self.gain);
        self.posteri_prev.copy_from_slice(&self.posteri);
        self.frame += 1;
        Ok(())
    }

    fn reset(&mut self) {
        self.posteri_prev.fill(0.0);
        self.gain_prev.fill(0.0);
        self.snr_seg = 0.0;
        self.frame = 0;
    }
}

// ============ Iterative Wiener ============

/// Iterative all-pole Wiener filter: the speech spectral envelope is re-fit
/// from the filtered frame on each pass.
pub struct WienerIter {
    power: Vec<f64>,
    noise_ps: Vec<f64>,
    envelope: Vec<f64>,
    gain: Vec<f64>,
    snr_seg: f64,
}

impl WienerIter {
    const LPC_ORDER: usize = 12;
    const ITERATIONS: usize = 3;
    const MIN_ENERGY: f64 = 1e-16;

    pub fn new(bins: usize) -> Self {
        Self {
            power: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            envelope: vec![0.0; bins],
            gain: vec![0.0; bins],
            snr_seg: 0.0,
        }
    }
}

impl Enhancer for WienerIter {
    fn process(
        &mut self,
        frame: &mut Frame,
        noise: &mut dyn NoiseEstimator,
        datalen: usize,
    ) -> DspResult<()> {
        let fft_size = frame.fft_size();
        let datalen = datalen.min(fft_size);

        let mut lpc = lpc_coefficients(&frame.time()[..datalen], Self::LPC_ORDER);

        frame.forward()?;
        frame.magnitude_into(&mut self.power);

        let norm_ps = power_spectrum(&mut self.power);
        let norm_ns = noise.estimate(&self.power, &mut self.noise_ps, self.snr_seg);
        self.snr_seg = segmental_snr(norm_ps, norm_ns);

        for iteration in 0..Self::ITERATIONS {
            // All-pole envelope 1 / |A(e^jw)|^2 at each bin, plus the
            // excitation energy of the current residual estimate.
            let mut envelope_energy = 0.0;
            let mut excitation = 0.0;
            for k in 0..self.envelope.len() {
                let omega = 2.0 * std::f64::consts::PI * k as f64 / fft_size as f64;
                let mut re = 1.0;
                let mut im = 0.0;
                for (j, &a) in lpc.iter().enumerate() {
                    let angle = (j + 1) as f64 * omega;
                    re += angle.cos() * a;
                    im += angle.sin() * a;
                }
                self.envelope[k] = 1.0 / (re * re + im * im);
                envelope_energy += self.envelope[k];
                excitation += self.power[k] - self.noise_ps[k];
            }

            let g = sanitize(excitation / envelope_energy).max(Self::MIN_ENERGY);

            for k in 0..self.gain.len() {
                let speech = g * self.envelope[k];
                self.gain[k] = speech / (speech + self.noise_ps[k]);
            }

            frame.apply_gain(&self.gain);
            frame.inverse()?;

            if iteration < Self::ITERATIONS - 1 {
                let scale = fft_size as f64;
                let time = frame.time_mut();
                for (i, s) in time.iter_mut().enumerate() {
                    if i < datalen {
                        *s /= scale;
                    } else {
                        *s = 0.0;
                    }
                }

                lpc = lpc_coefficients(frame.time(), Self::LPC_ORDER);
                frame.forward()?;
            }
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.snr_seg = 0.0;
    }
}

// ============ Residual noise output ============

/// Replaces the signal magnitude with the square root of the noise estimate,
/// keeping the signal phase. Evaluation aid for the estimators.
pub struct Residual {
    power: Vec<f64>,
    phase: Vec<f64>,
    noise_ps: Vec<f64>,
    snr_seg: f64,
}

impl Residual {
    pub fn new(bins: usize) -> Self {
        Self {
            power: vec![0.0; bins],
            phase: vec![0.0; bins],
            noise_ps: vec![0.0; bins],
            snr_seg: 0.0,
        }
    }
}

impl Enhancer for Residual {
    fn process(
        &mut self,
        frame: &mut Frame,
        noise: &mut dyn NoiseEstimator,
        _datalen: usize,
    ) -> DspResult<()> {
        frame.forward()?;
        frame.magnitude_into(&mut self.power);
        frame.phase_into(&mut self.phase);

        let norm_ps = power_spectrum(&mut self.power);
        let norm_ns = noise.estimate(&self.power, &mut self.noise_ps, self.snr_seg);
        self.snr_seg = segmental_snr(norm_ps, norm_ns);

        for n in self.noise_ps.iter_mut() {
            *n = n.sqrt();
        }

        frame.set_polar(&self.noise_ps, &self.phase);
        frame.inverse()
    }

    fn reset(&mut self) {
        self.snr_seg = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::Vad;
    use approx::assert_abs_diff_eq;
    use realfft::RealFftPlanner;

    const FFT_SIZE: usize = 256;
    const DATALEN: usize = 128;

    /// Estimator stub reporting no noise at all.
    struct ZeroNoise;

    impl NoiseEstimator for ZeroNoise {
        fn estimate(&mut self, _ps: &[f64], noise_ps: &mut [f64], _snr: f64) -> f64 {
            noise_ps.fill(0.0);
            0.0
        }

        fn reset(&mut self) {}
    }

    /// Estimator stub echoing the signal power back as noise.
    struct IdentityNoise;

    impl NoiseEstimator for IdentityNoise {
        fn estimate(&mut self, ps: &[f64], noise_ps: &mut [f64], _snr: f64) -> f64 {
            noise_ps.copy_from_slice(ps);
            ps.iter().sum()
        }

        fn reset(&mut self) {}
    }

    /// Estimator stub with a fixed flat noise floor.
    struct FlatNoise(f64);

    impl NoiseEstimator for FlatNoise {
        fn estimate(&mut self, _ps: &[f64], noise_ps: &mut [f64], _snr: f64) -> f64 {
            noise_ps.fill(self.0);
            self.0 * noise_ps.len() as f64
        }

        fn reset(&mut self) {}
    }

    fn loaded_frame(signal: &[f64]) -> Frame {
        let mut planner = RealFftPlanner::new();
        let mut frame = Frame::new(FFT_SIZE, &mut planner);
        frame.load(signal);
        frame
    }

    fn test_signal() -> Vec<f64> {
        (0..DATALEN)
            .map(|i| (2.0 * std::f64::consts::PI * 7.0 * i as f64 / DATALEN as f64).sin())
            .collect()
    }

    fn all_kinds() -> [EnhancerKind; 5] {
        [
            EnhancerKind::SpecSub,
            EnhancerKind::Mmse,
            EnhancerKind::WienerAs,
            EnhancerKind::WienerIter,
            EnhancerKind::Residual,
        ]
    }

    #[test]
    fn specsub_with_zero_noise_is_transparent() {
        let signal = test_signal();
        let mut frame = loaded_frame(&signal);
        let mut enhancer = SpectralSub::new(frame.bins());

        enhancer
            .process(&mut frame, &mut ZeroNoise, DATALEN)
            .unwrap();

        for (out, reference) in frame.time()[..DATALEN].iter().zip(&signal) {
            assert_abs_diff_eq!(out / FFT_SIZE as f64, reference, epsilon = 1e-10);
        }
    }

    #[test]
    fn specsub_clamps_to_spectral_floor() {
        // With noise equal to the signal power every bin oversubtracts to a
        // negative value and must land on floor * noise.
        let signal = test_signal();
        let mut frame = loaded_frame(&signal);
        let bins = frame.bins();

        let mut reference = loaded_frame(&signal);
        reference.forward().unwrap();
        let mut expected = vec![0.0; bins];
        reference.magnitude_into(&mut expected);
        for m in expected.iter_mut() {
            // floor * power, back to magnitude
            *m = (SpectralSub::FLOOR * *m * *m).sqrt();
        }

        let mut enhancer = SpectralSub::new(bins);
        enhancer
            .process(&mut frame, &mut IdentityNoise, DATALEN)
            .unwrap();

        // Re-analyze the output to compare magnitudes.
        let scaled: Vec<f64> = frame.time().iter().map(|s| s / FFT_SIZE as f64).collect();
        let mut check = loaded_frame(&scaled);
        check.forward().unwrap();
        let mut got = vec![0.0; bins];
        check.magnitude_into(&mut got);

        for (g, e) in got.iter().zip(&expected) {
            assert_abs_diff_eq!(g, e, epsilon = 1e-8);
        }
    }

    #[test]
    fn residual_outputs_noise_spectrum() {
        let signal = test_signal();
        let mut frame = loaded_frame(&signal);
        let bins = frame.bins();

        let mut enhancer = Residual::new(bins);
        enhancer
            .process(&mut frame, &mut FlatNoise(4.0), DATALEN)
            .unwrap();

        let scaled: Vec<f64> = frame.time().iter().map(|s| s / FFT_SIZE as f64).collect();
        let mut check = loaded_frame(&scaled);
        check.forward().unwrap();
        let mut got = vec![0.0; bins];
        check.magnitude_into(&mut got);

        for &m in &got {
            assert_abs_diff_eq!(m, 2.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn wiener_as_applies_uniform_subunity_gain_on_zero_noise() {
        let signal = test_signal();
        let mut frame = loaded_frame(&signal);
        let mut enhancer = WienerAs::new(frame.bins());

        enhancer
            .process(&mut frame, &mut ZeroNoise, DATALEN)
            .unwrap();

        // First frame with zero noise: priori = a_dd everywhere.
        let expected_gain = (WienerAs::A_DD / (1.0 + WienerAs::A_DD)).sqrt();
        for (out, reference) in frame.time()[..DATALEN].iter().zip(&signal) {
            assert_abs_diff_eq!(
                out / FFT_SIZE as f64,
                reference * expected_gain,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn all_enhancers_keep_silence_silent() {
        for kind in all_kinds() {
            let mut frame = loaded_frame(&[0.0; DATALEN]);
            let mut enhancer = kind.build(frame.bins());
            let mut estimator = Vad::new(frame.bins());

            for _ in 0..8 {
                frame.load(&[0.0; DATALEN]);
                enhancer
                    .process(&mut frame, &mut estimator, DATALEN)
                    .unwrap();
                assert!(
                    frame.time().iter().all(|&s| s == 0.0),
                    "{kind:?} broke silence"
                );
            }
        }
    }

    #[test]
    fn all_enhancers_produce_finite_output() {
        for kind in all_kinds() {
            let signal = test_signal();
            let mut frame = loaded_frame(&signal);
            let mut enhancer = kind.build(frame.bins());
            let mut estimator = Vad::new(frame.bins());

            for _ in 0..10 {
                frame.load(&signal);
                enhancer
                    .process(&mut frame, &mut estimator, DATALEN)
                    .unwrap();
                assert!(
                    frame.time().iter().all(|s| s.is_finite()),
                    "{kind:?} produced a non-finite sample"
                );
            }
        }
    }

    #[test]
    fn mmse_attenuates_flat_noise_floor() {
        let signal = test_signal();
        let mut frame = loaded_frame(&signal);
        let mut enhancer = Mmse::new(frame.bins());

        let input_energy: f64 = signal.iter().map(|s| s * s).sum();
        let mut output_energy = 0.0;
        for _ in 0..10 {
            frame.load(&signal);
            enhancer
                .process(&mut frame, &mut FlatNoise(1e-3), DATALEN)
                .unwrap();
            output_energy = frame
                .time()
                .iter()
                .map(|s| (s / FFT_SIZE as f64).powi(2))
                .sum();
        }

        assert!(output_energy.is_finite());
        assert!(
            output_energy < input_energy,
            "MMSE should not add energy: {output_energy} vs {input_energy}"
        );
    }

    #[test]
    fn berouti_bounds() {
        assert_eq!(berouti(-10.0), 5.0);
        assert_eq!(berouti(25.0), 1.0);
        assert_abs_diff_eq!(berouti(0.0), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(berouti(20.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn kind_resolution() {
        assert_eq!(
            EnhancerKind::from_name("wiener-as"),
            Some(EnhancerKind::WienerAs)
        );
        assert_eq!(EnhancerKind::from_name("omlsa"), None);
        assert_eq!(EnhancerKind::default(), EnhancerKind::SpecSub);
    }
}
