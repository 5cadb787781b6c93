//! Derived streaming parameters
//!
//! Turns the user-facing [`EngineConfig`] plus the audio header into the
//! fixed framing the driver runs with. The window size is forced even; an
//! automatic FFT size is the next power of two at or above twice the window,
//! and when that exceeds the transform cap the frame duration is walked down
//! a millisecond at a time until it fits.

use crate::config::{EngineConfig, FFT_MAX};
use crate::error::{EngineError, EngineResult};

/// Framing parameters for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub sample_rate: u32,
    /// Channel count after any downmix.
    pub channels: usize,
    /// Effective frame duration after auto-sizing, in milliseconds.
    pub frame_duration_ms: u32,
    pub window_size: usize,
    pub fft_size: usize,
    pub noverlap: usize,
    pub nslide: usize,
    pub downmix: bool,
}

impl StreamParams {
    /// Derives framing from the configuration and the audio header.
    pub fn derive(
        config: &EngineConfig,
        sample_rate: u32,
        input_channels: usize,
    ) -> EngineResult<Self> {
        config.validate()?;

        if input_channels == 0 {
            return Err(EngineError::InvalidConfig(
                "input has no channels".to_string(),
            ));
        }

        let mut frame_duration = config.frame_duration_ms;
        let mut fft_size = config.fft_size as usize;
        let window_size = loop {
            if frame_duration == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "no frame duration fits an FFT of at most {FFT_MAX} at {sample_rate} Hz"
                )));
            }

            let mut window_size =
                (frame_duration as u64 * sample_rate as u64 / 1000) as usize;
            if window_size % 2 != 0 {
                window_size += 1;
            }
            if window_size == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "sample rate {sample_rate} Hz is too low for a {frame_duration} ms frame"
                )));
            }

            if fft_size == 0 || fft_size > FFT_MAX {
                fft_size = (2 * window_size).next_power_of_two();
                if fft_size > FFT_MAX {
                    fft_size = 0;
                    frame_duration -= 1;
                    continue;
                }
            }

            break window_size;
        };

        if window_size > fft_size {
            return Err(EngineError::InvalidConfig(format!(
                "FFT size {fft_size} is smaller than the window size {window_size}"
            )));
        }

        let noverlap = window_size * config.overlap_pct as usize / 100;
        let nslide = window_size - noverlap;
        let channels = if config.downmix { 1 } else { input_channels };

        Ok(Self {
            sample_rate,
            channels,
            frame_duration_ms: frame_duration,
            window_size,
            fft_size,
            noverlap,
            nslide,
            downmix: config.downmix,
        })
    }

    /// Number of spectral bins for this framing.
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}
