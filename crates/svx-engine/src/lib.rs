//! svx-engine: the SpectraVox enhancement pipeline
//!
//! Composes the DSP kernels and the suppression stage into a streaming
//! engine:
//!
//! ```text
//! WavSource -> frame slide -> window -> Enhancer x NoiseEstimator
//!           -> overlap-add -> WavSink
//! ```
//!
//! - `config` - engine parameters and the line-oriented configuration file
//! - `params` - framing derived from the config and the audio header
//! - `wav` - streaming WAV input/output in interleaved f64
//! - `stft` - the overlap-add driver with per-channel suppression state
//! - `error` - the engine error taxonomy

mod config;
mod error;
mod params;
mod stft;
mod wav;

pub use config::{ConfigFile, EngineConfig, FFT_MAX};
pub use error::{EngineError, EngineResult};
pub use params::StreamParams;
pub use stft::{EnhancePipeline, RunStats};
pub use wav::{format_duration, WavSink, WavSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
