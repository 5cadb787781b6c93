//! Pipeline integration tests
//!
//! End-to-end runs over real WAV files:
//! - noisy tone enhancement improves the in-band SNR
//! - silence stays silence for every estimator x suppressor pair
//! - downmix equals per-channel processing plus averaging for identical
//!   channels under the residual suppressor
//! - a reset pipeline reproduces its first run

use std::path::Path;

use hound::{SampleFormat, WavSpec};
use svx_denoise::{EnhancerKind, NoiseEstimatorKind};
use svx_engine::{EnhancePipeline, EngineConfig, WavSink, WavSource};
use tempfile::tempdir;

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn float_spec(channels: u16, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[f64]) {
    let mut sink = WavSink::create(path, float_spec(channels, sample_rate)).unwrap();
    sink.write_frames(samples, samples.len() / channels as usize)
        .unwrap();
    sink.finalize().unwrap();
}

fn read_wav(path: &Path) -> (WavSpec, Vec<f64>) {
    let mut source = WavSource::open(path).unwrap();
    let spec = source.spec();
    let frames = source.frames() as usize;
    let mut buf = vec![0.0; frames * spec.channels as usize];
    let got = source.read_frames(&mut buf, frames).unwrap();
    buf.truncate(got * spec.channels as usize);
    (spec, buf)
}

/// Deterministic white noise in [-1, 1].
fn hash_noise(i: usize) -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    i.hash(&mut hasher);
    (hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0
}

/// Power of the complex correlation against `freq`, versus total power.
fn tone_to_rest_ratio(signal: &[f64], sample_rate: u32, freq: f64) -> f64 {
    let n = signal.len() as f64;
    let omega = 2.0 * std::f64::consts::PI * freq / sample_rate as f64;
    let mut re = 0.0;
    let mut im = 0.0;
    for (i, &s) in signal.iter().enumerate() {
        re += s * (omega * i as f64).cos();
        im -= s * (omega * i as f64).sin();
    }
    // Mean power of the correlated component vs everything else.
    let tone_power = 2.0 * (re * re + im * im) / (n * n);
    let total_power = signal.iter().map(|s| s * s).sum::<f64>() / n;
    tone_power / (total_power - tone_power).max(1e-12)
}

fn run_pipeline(
    config: &EngineConfig,
    input: &Path,
    output: &Path,
) -> svx_engine::RunStats {
    let mut source = WavSource::open(input).unwrap();
    let spec = source.spec();
    let mut pipeline =
        EnhancePipeline::new(config, spec.sample_rate, spec.channels as usize).unwrap();

    let out_spec = WavSpec {
        channels: pipeline.params().channels as u16,
        ..spec
    };
    let mut sink = WavSink::create(output, out_spec).unwrap();
    let stats = pipeline.run(&mut source, &mut sink).unwrap();
    sink.finalize().unwrap();
    stats
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn specsub_improves_snr_of_noisy_tone() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("noisy.wav");
    let output = dir.path().join("enhanced.wav");

    let sample_rate = 48_000;
    let freq = 1000.0;
    // Half a second of noise for the estimator to learn, then one second of
    // a 1 kHz tone at -5 dB SNR against the same noise floor.
    let lead_in = sample_rate as usize / 2;
    let tone_amp = 0.3;
    let noise_scale = 0.653;
    let samples: Vec<f64> = (0..lead_in + sample_rate as usize)
        .map(|i| {
            let noise = noise_scale * hash_noise(i);
            if i < lead_in {
                noise
            } else {
                let t = (i - lead_in) as f64 / sample_rate as f64;
                tone_amp * (2.0 * std::f64::consts::PI * freq * t).sin() + noise
            }
        })
        .collect();
    write_wav(&input, 1, sample_rate, &samples);

    let config = EngineConfig::default(); // specsub, vad, 20 ms, 50%, hamming
    run_pipeline(&config, &input, &output);

    let (spec, enhanced) = read_wav(&output);
    assert_eq!(spec.sample_rate, sample_rate);
    assert_eq!(spec.channels, 1);

    // Duration preserved within one analysis window.
    let diff = enhanced.len() as i64 - samples.len() as i64;
    assert!(diff.abs() <= 960, "duration drifted by {diff} frames");

    let len = samples.len().min(enhanced.len());
    let snr_in = tone_to_rest_ratio(&samples[..len], sample_rate, freq);
    let snr_out = tone_to_rest_ratio(&enhanced[..len], sample_rate, freq);
    assert!(
        snr_out > snr_in,
        "expected SNR improvement, got {snr_in:.3} -> {snr_out:.3}"
    );
}

#[test]
fn silence_in_silence_out_for_every_pair() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("silence.wav");
    let sample_rate = 16_000;
    write_wav(&input, 1, sample_rate, &vec![0.0; 4_000]);

    let estimators = [
        NoiseEstimatorKind::Vad,
        NoiseEstimatorKind::Hirsch,
        NoiseEstimatorKind::Doblinger,
        NoiseEstimatorKind::Mcra,
        NoiseEstimatorKind::Mcra2,
    ];
    let enhancers = [
        EnhancerKind::SpecSub,
        EnhancerKind::Mmse,
        EnhancerKind::WienerAs,
        EnhancerKind::WienerIter,
        EnhancerKind::Residual,
    ];

    for estimator in estimators {
        for enhancer in enhancers {
            let output = dir.path().join(format!("{estimator:?}_{enhancer:?}.wav"));
            let config = EngineConfig {
                noise_estimator: estimator,
                enhancer,
                ..Default::default()
            };
            run_pipeline(&config, &input, &output);

            let (_, enhanced) = read_wav(&output);
            assert!(!enhanced.is_empty());
            assert!(
                enhanced.iter().all(|&s| s == 0.0),
                "{estimator:?} x {enhancer:?} broke silence"
            );
        }
    }
}

#[test]
fn downmix_matches_averaged_channels_for_residual() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("stereo.wav");
    let out_downmix = dir.path().join("downmix.wav");
    let out_stereo = dir.path().join("stereo_out.wav");

    let sample_rate = 16_000;
    let mono: Vec<f64> = (0..sample_rate as usize / 2)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            0.3 * (2.0 * std::f64::consts::PI * 440.0 * t).sin() + 0.2 * hash_noise(i)
        })
        .collect();
    // Identical left and right channels.
    let interleaved: Vec<f64> = mono.iter().flat_map(|&s| [s, s]).collect();
    write_wav(&input, 2, sample_rate, &interleaved);

    let base = EngineConfig {
        enhancer: EnhancerKind::Residual,
        ..Default::default()
    };

    let downmix_config = EngineConfig {
        downmix: true,
        ..base.clone()
    };
    run_pipeline(&downmix_config, &input, &out_downmix);
    run_pipeline(&base, &input, &out_stereo);

    let (mixed_spec, mixed) = read_wav(&out_downmix);
    let (stereo_spec, stereo) = read_wav(&out_stereo);
    assert_eq!(mixed_spec.channels, 1);
    assert_eq!(stereo_spec.channels, 2);

    let averaged: Vec<f64> = stereo.chunks_exact(2).map(|f| (f[0] + f[1]) / 2.0).collect();
    assert_eq!(mixed.len(), averaged.len());
    for (i, (a, b)) in mixed.iter().zip(&averaged).enumerate() {
        assert!(
            (a - b).abs() < 1e-9,
            "sample {i} diverged: {a} vs {b}"
        );
    }
}

#[test]
fn reset_pipeline_reproduces_first_run() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("tone.wav");
    let out_a = dir.path().join("a.wav");
    let out_b = dir.path().join("b.wav");

    let sample_rate = 16_000;
    let samples: Vec<f64> = (0..4_000)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            0.4 * (2.0 * std::f64::consts::PI * 250.0 * t).sin() + 0.1 * hash_noise(i)
        })
        .collect();
    write_wav(&input, 1, sample_rate, &samples);

    let config = EngineConfig {
        enhancer: EnhancerKind::WienerAs,
        noise_estimator: NoiseEstimatorKind::Mcra,
        ..Default::default()
    };

    let mut pipeline = EnhancePipeline::new(&config, sample_rate, 1).unwrap();

    let mut source = WavSource::open(&input).unwrap();
    let mut sink = WavSink::create(&out_a, float_spec(1, sample_rate)).unwrap();
    pipeline.run(&mut source, &mut sink).unwrap();
    sink.finalize().unwrap();

    pipeline.reset();

    let mut source = WavSource::open(&input).unwrap();
    let mut sink = WavSink::create(&out_b, float_spec(1, sample_rate)).unwrap();
    pipeline.run(&mut source, &mut sink).unwrap();
    sink.finalize().unwrap();

    let (_, a) = read_wav(&out_a);
    let (_, b) = read_wav(&out_b);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x, y);
    }
}

#[test]
fn output_block_count_matches_slide_accounting() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let sample_rate = 16_000;
    write_wav(&input, 1, sample_rate, &vec![0.25; 4_000]);

    let stats = run_pipeline(&EngineConfig::default(), &input, &output);
    assert_eq!(stats.frames_read, 4_000);
    // Every iteration, including the flush, emits exactly nslide frames.
    assert_eq!(stats.frames_written % 160, 0);
    let (_, out) = read_wav(&output);
    assert_eq!(out.len() as u64, stats.frames_written);
}
