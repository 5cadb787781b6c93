//! Real-input FFT frame and spectral kernels
//!
//! A [`Frame`] is the unit every suppressor operates on: a time-domain buffer
//! of `fft_size` samples and its `fft_size / 2 + 1`-bin complex spectrum,
//! bound to shared forward/inverse plans. The forward transform is
//! unnormalized; the inverse carries a factor of `fft_size` which the
//! overlap-add driver divides out during resynthesis.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::{DspError, DspResult};

/// Maps NaN and infinities to zero, leaves finite values untouched.
pub fn sanitize(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Squares a magnitude spectrum in place and returns the total power.
pub fn power_spectrum(magnitude: &mut [f64]) -> f64 {
    let mut norm = 0.0;
    for m in magnitude.iter_mut() {
        *m *= *m;
        norm += *m;
    }
    norm
}

/// One analysis frame bound to its FFT plans.
pub struct Frame {
    fft_size: usize,
    time: Vec<f64>,
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    fft_forward: Arc<dyn RealToComplex<f64>>,
    fft_inverse: Arc<dyn ComplexToReal<f64>>,
}

impl Frame {
    /// Create a frame for the given transform size.
    ///
    /// Plans are pulled from the shared planner, so frames of the same size
    /// reuse the same plan storage.
    pub fn new(fft_size: usize, planner: &mut RealFftPlanner<f64>) -> Self {
        let fft_forward = planner.plan_fft_forward(fft_size);
        let fft_inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = fft_forward
            .get_scratch_len()
            .max(fft_inverse.get_scratch_len());

        Self {
            fft_size,
            time: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); fft_size / 2 + 1],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            fft_forward,
            fft_inverse,
        }
    }

    /// Transform size.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of spectral bins (`fft_size / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Copies `samples` into the time buffer, zero-padding the tail.
    pub fn load(&mut self, samples: &[f64]) {
        let n = samples.len().min(self.fft_size);
        self.time[..n].copy_from_slice(&samples[..n]);
        self.time[n..].fill(0.0);
    }

    /// Time-domain view.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Mutable time-domain view.
    pub fn time_mut(&mut self) -> &mut [f64] {
        &mut self.time
    }

    /// Spectral view. Only meaningful after [`Frame::forward`].
    pub fn spectrum(&self) -> &[Complex<f64>] {
        &self.spectrum
    }

    /// Time domain -> spectrum. The time buffer is used as FFT scratch and
    /// holds no meaningful data afterwards.
    pub fn forward(&mut self) -> DspResult<()> {
        self.fft_forward
            .process_with_scratch(&mut self.time, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| DspError::Fft(e.to_string()))
    }

    /// Spectrum -> time domain, scaled by `fft_size` (realfft's inverse is
    /// unnormalized). The spectrum buffer is consumed as scratch.
    pub fn inverse(&mut self) -> DspResult<()> {
        self.fft_inverse
            .process_with_scratch(&mut self.spectrum, &mut self.time, &mut self.scratch)
            .map_err(|e| DspError::Fft(e.to_string()))
    }

    /// Writes the magnitude of each bin into `out`.
    pub fn magnitude_into(&self, out: &mut [f64]) {
        for (m, c) in out.iter_mut().zip(&self.spectrum) {
            *m = c.norm();
        }
    }

    /// Writes the phase of each bin into `out`, in (-pi, pi].
    pub fn phase_into(&self, out: &mut [f64]) {
        for (p, c) in out.iter_mut().zip(&self.spectrum) {
            *p = c.arg();
        }
    }

    /// Rebuilds the spectrum from magnitude and phase.
    ///
    /// DC and Nyquist bins of a real-input spectrum are purely real, and
    /// realfft rejects spectra where they are not, so their imaginary parts
    /// are forced to zero after the polar reconstruction.
    pub fn set_polar(&mut self, magnitude: &[f64], phase: &[f64]) {
        for ((c, &m), &p) in self.spectrum.iter_mut().zip(magnitude).zip(phase) {
            *c = Complex::from_polar(m, p);
        }
        let last = self.spectrum.len() - 1;
        self.spectrum[0].im = 0.0;
        if self.fft_size % 2 == 0 {
            self.spectrum[last].im = 0.0;
        }
    }

    /// Multiplies each bin by a real gain.
    pub fn apply_gain(&mut self, gain: &[f64]) {
        for (c, &g) in self.spectrum.iter_mut().zip(gain) {
            *c *= g;
        }
    }
}
