//! WAV streaming over hound
//!
//! Samples cross the pipeline as interleaved `f64`; integer input formats
//! are normalized on read and re-quantized on write. The sink inherits the
//! source spec, with the channel count dropped to one under downmix.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{EngineError, EngineResult};

/// Streaming WAV input.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    mix: Vec<f64>,
}

impl std::fmt::Debug for WavSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavSource")
            .field("spec", &self.spec)
            .field("mix", &self.mix)
            .finish()
    }
}

impl WavSource {
    /// Opens a WAV file for streaming reads.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let reader = WavReader::open(path).map_err(|e| {
            EngineError::ReadError(format!(
                "unable to open input file '{}': {e}",
                path.display()
            ))
        })?;
        let spec = reader.spec();
        Ok(Self {
            reader,
            spec,
            mix: Vec::new(),
        })
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    /// Total number of frames in the stream.
    pub fn frames(&self) -> u64 {
        self.reader.duration() as u64
    }

    /// Reads up to `frames` interleaved frames into `buf`, returning the
    /// number of complete frames read. A return of zero means end of stream.
    pub fn read_frames(&mut self, buf: &mut [f64], frames: usize) -> EngineResult<usize> {
        let channels = self.channels();
        let want = frames * channels;
        debug_assert!(buf.len() >= want);

        let mut got = 0;
        match self.spec.sample_format {
            SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(want) {
                    let sample =
                        sample.map_err(|e| EngineError::ReadError(e.to_string()))?;
                    buf[got] = sample as f64;
                    got += 1;
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (self.spec.bits_per_sample - 1)) as f64;
                for sample in self.reader.samples::<i32>().take(want) {
                    let sample =
                        sample.map_err(|e| EngineError::ReadError(e.to_string()))?;
                    buf[got] = sample as f64 * scale;
                    got += 1;
                }
            }
        }

        Ok(got / channels)
    }

    /// Reads up to `frames` frames mixed down to mono, one sample per frame.
    pub fn read_frames_mixed(&mut self, buf: &mut [f64], frames: usize) -> EngineResult<usize> {
        let channels = self.channels();
        if channels == 1 {
            return self.read_frames(buf, frames);
        }

        self.mix.resize(frames * channels, 0.0);
        let mut scratch = std::mem::take(&mut self.mix);
        let got = self.read_frames(&mut scratch, frames)?;
        for (k, frame) in scratch[..got * channels].chunks_exact(channels).enumerate() {
            buf[k] = frame.iter().sum::<f64>() / channels as f64;
        }
        self.mix = scratch;
        Ok(got)
    }
}

/// Streaming WAV output.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    spec: WavSpec,
}

impl WavSink {
    /// Creates the output file with the given spec.
    pub fn create(path: &Path, spec: WavSpec) -> EngineResult<Self> {
        let writer = WavWriter::create(path, spec).map_err(|e| {
            EngineError::WriteError(format!(
                "unable to open output file '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self { writer, spec })
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Writes `frames` interleaved frames from `buf`.
    pub fn write_frames(&mut self, buf: &[f64], frames: usize) -> EngineResult<()> {
        let count = frames * self.spec.channels as usize;
        let write_err = |e: hound::Error| EngineError::WriteError(e.to_string());

        match (self.spec.sample_format, self.spec.bits_per_sample) {
            (SampleFormat::Float, _) => {
                for &sample in &buf[..count] {
                    self.writer.write_sample(sample as f32).map_err(write_err)?;
                }
            }
            (SampleFormat::Int, 8) => {
                for &sample in &buf[..count] {
                    let s = (sample.clamp(-1.0, 1.0) * 127.0) as i8;
                    self.writer.write_sample(s).map_err(write_err)?;
                }
            }
            (SampleFormat::Int, 16) => {
                for &sample in &buf[..count] {
                    let s = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                    self.writer.write_sample(s).map_err(write_err)?;
                }
            }
            (SampleFormat::Int, 24) => {
                for &sample in &buf[..count] {
                    let s = (sample.clamp(-1.0, 1.0) * 8388607.0) as i32;
                    self.writer.write_sample(s).map_err(write_err)?;
                }
            }
            (SampleFormat::Int, 32) => {
                for &sample in &buf[..count] {
                    let s = (sample.clamp(-1.0, 1.0) * 2147483647.0) as i32;
                    self.writer.write_sample(s).map_err(write_err)?;
                }
            }
            (SampleFormat::Int, bits) => {
                return Err(EngineError::WriteError(format!(
                    "unsupported bit depth: {bits}"
                )));
            }
        }

        Ok(())
    }

    /// Flushes headers and closes the file.
    pub fn finalize(self) -> EngineResult<()> {
        self.writer
            .finalize()
            .map_err(|e| EngineError::WriteError(e.to_string()))
    }
}

/// Formats a frame count as `m:ss.mmm` (or `h:mm:ss.mmm`).
pub fn format_duration(sample_rate: u32, frames: u64) -> String {
    if sample_rate == 0 {
        return "0:00.000".to_string();
    }
    let seconds = frames as f64 / sample_rate as f64;
    let total_secs = seconds as u64;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    let ms = ((seconds - total_secs as f64) * 1000.0) as u64;

    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}.{ms:03}")
    } else {
        format!("{mins}:{secs:02}.{ms:03}")
    }
}
