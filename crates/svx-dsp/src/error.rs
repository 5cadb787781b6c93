//! Error types for the DSP kernels

use thiserror::Error;

/// DSP kernel errors
#[derive(Error, Debug)]
pub enum DspError {
    #[error("FFT execution failed: {0}")]
    Fft(String),

    #[error("Buffer mismatch: expected {expected} samples, got {got}")]
    BufferMismatch { expected: usize, got: usize },
}

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;
