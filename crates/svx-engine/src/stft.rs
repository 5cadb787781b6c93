//! STFT overlap-add driver
//!
//! Owns the per-stream machinery: derived framing, the analysis window, one
//! FFT frame shared across channels, and per-channel suppression state
//! (estimator, enhancer, overlap tail - never shared between channels).
//!
//! Each iteration slides the analysis buffer by `nslide` frames, runs every
//! channel through its suppressor, overlap-adds the resynthesized block with
//! the previous tail and emits `nslide` output frames. Resynthesis divides
//! out the inverse transform's `fft_size` factor and normalizes by
//! `nslide / sum(window)`.
//!
//! The overlap-add happens in place in the frame buffer and the next tail is
//! read from it afterwards at offset `noverlap`. At 50% overlap the tail
//! region is untouched resynthesis output; at lower overlaps the aliased
//! slots carry the emitted block attenuated by `fft_size`, which is what
//! keeps the zero-overlap rectangular configuration transparent.

use realfft::RealFftPlanner;
use svx_denoise::{Enhancer, NoiseEstimator};
use svx_dsp::{Frame, Window};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::params::StreamParams;
use crate::wav::{WavSink, WavSource};

/// Totals reported after a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames_read: u64,
    pub frames_written: u64,
}

struct ChannelState {
    enhancer: Box<dyn Enhancer>,
    estimator: Box<dyn NoiseEstimator>,
    /// Previous tail of the reconstruction, `nslide` samples.
    overlap: Vec<f64>,
}

/// The streaming enhancement pipeline.
pub struct EnhancePipeline {
    params: StreamParams,
    window: Window,
    win_gain_norm: f64,
    frame: Frame,
    channels: Vec<ChannelState>,
    /// Interleaved analysis buffer, `window_size` frames.
    multi: Vec<f64>,
    /// Tail of the previous analysis buffer, `noverlap` frames.
    prev_multi: Vec<f64>,
    /// Interleaved output block, `nslide` frames.
    out_multi: Vec<f64>,
    /// De-interleaved scratch for one channel.
    chan: Vec<f64>,
}

impl EnhancePipeline {
    /// Builds the pipeline for one stream.
    pub fn new(
        config: &EngineConfig,
        sample_rate: u32,
        input_channels: usize,
    ) -> EngineResult<Self> {
        let params = StreamParams::derive(config, sample_rate, input_channels)?;

        let window = Window::new(config.window, params.window_size);
        if window.gain() <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "{} of size {} sums to zero",
                config.window.label(),
                params.window_size
            )));
        }
        let win_gain_norm = params.nslide as f64 / window.gain();

        let mut planner = RealFftPlanner::new();
        let frame = Frame::new(params.fft_size, &mut planner);

        let channels = (0..params.channels)
            .map(|_| ChannelState {
                enhancer: config.enhancer.build(params.bins()),
                estimator: config.noise_estimator.build(
                    params.bins(),
                    params.fft_size,
                    sample_rate,
                ),
                overlap: vec![0.0; params.nslide],
            })
            .collect();

        Ok(Self {
            params,
            window,
            win_gain_norm,
            frame,
            channels,
            multi: vec![0.0; params.window_size * params.channels],
            prev_multi: vec![0.0; params.noverlap * params.channels],
            out_multi: vec![0.0; params.nslide * params.channels],
            chan: vec![0.0; params.window_size],
        })
    }

    /// Derived framing for this stream.
    pub fn params(&self) -> StreamParams {
        self.params
    }

    /// Restores the cold-start state so the pipeline can process a new
    /// stream with the same framing.
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            state.enhancer.reset();
            state.estimator.reset();
            state.overlap.fill(0.0);
        }
        self.multi.fill(0.0);
        self.prev_multi.fill(0.0);
        self.out_multi.fill(0.0);
    }

    /// Streams `source` through the suppressor into `sink`.
    pub fn run(&mut self, source: &mut WavSource, sink: &mut WavSink) -> EngineResult<RunStats> {
        let ws = self.params.window_size;
        let nov = self.params.noverlap;
        let nsl = self.params.nslide;
        let ch = self.params.channels;
        let downmix = self.params.downmix;
        let fft_scale = self.params.fft_size as f64;

        let mut stats = RunStats::default();
        let mut first = true;

        loop {
            let count = if first {
                let n = read_input(source, downmix, &mut self.multi, ws)?;
                if n == 0 {
                    return Err(EngineError::EmptyStream);
                }
                self.multi[n * ch..].fill(0.0);
                n
            } else {
                // The leading `noverlap` frames were put in place at the end
                // of the previous iteration; only the slide is read.
                let n = read_input(source, downmix, &mut self.multi[nov * ch..], nsl)?;
                self.multi[(nov + n) * ch..].fill(0.0);
                n
            };
            stats.frames_read += count as u64;

            for (c, state) in self.channels.iter_mut().enumerate() {
                for (i, slot) in self.chan.iter_mut().enumerate() {
                    *slot = self.multi[i * ch + c];
                }
                self.window.apply(&mut self.chan);
                self.frame.load(&self.chan);

                state
                    .enhancer
                    .process(&mut self.frame, state.estimator.as_mut(), ws)?;

                // Overlap-add in place, then remember the next tail.
                let time = self.frame.time_mut();
                for i in 0..nsl {
                    time[i] = self.win_gain_norm * (time[i] / fft_scale + state.overlap[i]);
                }
                for i in 0..nsl {
                    state.overlap[i] = time[i + nov] / fft_scale;
                }
                for i in 0..nsl {
                    self.out_multi[i * ch + c] = time[i];
                }
            }

            self.prev_multi
                .copy_from_slice(&self.multi[nsl * ch..ws * ch]);

            sink.write_frames(&self.out_multi, nsl)?;
            stats.frames_written += nsl as u64;

            if !first && count == 0 {
                // Final block flushed the remaining overlap tail.
                break;
            }
            first = false;

            let (head, _) = self.multi.split_at_mut(nov * ch);
            head.copy_from_slice(&self.prev_multi);
        }

        Ok(stats)
    }

    #[cfg(test)]
    fn set_channel_stages(
        &mut self,
        channel: usize,
        enhancer: Box<dyn Enhancer>,
        estimator: Box<dyn NoiseEstimator>,
    ) {
        self.channels[channel].enhancer = enhancer;
        self.channels[channel].estimator = estimator;
    }
}

fn read_input(
    source: &mut WavSource,
    downmix: bool,
    buf: &mut [f64],
    frames: usize,
) -> EngineResult<usize> {
    if downmix {
        source.read_frames_mixed(buf, frames)
    } else {
        source.read_frames(buf, frames)
    }
}
