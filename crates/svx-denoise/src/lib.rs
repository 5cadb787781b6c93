//! svx-denoise: noise estimation and spectral suppression
//!
//! The pluggable middle of the enhancement pipeline. A [`NoiseEstimator`]
//! tracks the noise power spectrum of one stream across frames; an
//! [`Enhancer`] transforms one time-domain frame in place using the noise
//! estimate for its channel. Five of each, all sharing one per-frame
//! contract:
//!
//! Estimators: VAD (default), Hirsch, Doblinger, MCRA, MCRA2.
//! Suppressors: spectral subtraction (default), MMSE-STSA, decision-directed
//! Wiener, iterative LPC Wiener, residual noise output.
//!
//! State is per channel: the driver builds one estimator and one enhancer
//! per channel and never shares them.

pub mod enhance;
pub mod estimate;

pub use enhance::{Enhancer, EnhancerKind};
pub use estimate::{NoiseEstimator, NoiseEstimatorKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
