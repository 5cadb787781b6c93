//! Error types for the enhancement engine

use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read audio: {0}")]
    ReadError(String),

    #[error("Failed to write audio: {0}")]
    WriteError(String),

    #[error("Input stream contains no samples")]
    EmptyStream,

    #[error("DSP error: {0}")]
    Dsp(#[from] svx_dsp::DspError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
