//! svx-dsp: spectral math kernels for SpectraVox
//!
//! The low-level pieces every stage of the enhancement pipeline is built on:
//!
//! - `spectrum` - real-input FFT frame, magnitude/phase/power extraction,
//!   polar resynthesis, per-bin gain
//! - `window` - analysis window family (Hamming, Hann, Blackman, Bartlett,
//!   Triangular, Rectangular, Nuttall)
//! - `lpc` - autocorrelation + Levinson-Durbin linear prediction
//! - `bessel` - modified Bessel functions I0/I1 for the MMSE gain

pub mod bessel;
pub mod lpc;
pub mod spectrum;
pub mod window;

mod error;

pub use error::{DspError, DspResult};
pub use spectrum::{power_spectrum, sanitize, Frame};
pub use window::{Window, WindowKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
