//! Command-line surface and option resolution
//!
//! Values given on the command line take precedence over the configuration
//! file; anything still unset falls back to the engine defaults. Unknown
//! window/estimator/enhancer names are substituted with the defaults and
//! diagnosed at info level, matching the engine's non-fatal name policy.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use svx_denoise::{EnhancerKind, NoiseEstimatorKind};
use svx_dsp::WindowKind;
use svx_engine::{ConfigFile, EngineConfig};

/// Single-channel speech enhancement over WAV files.
#[derive(Parser, Debug)]
#[command(
    name = "spectravox",
    version,
    about = "SpectraVox - single-channel speech enhancement toolkit",
    long_about = "Reduces stationary noise in recorded audio with short-time \
spectral suppression. Five enhancement algorithms (specsub, mmse, wiener-as, \
wiener-iter, residual) can be paired with five noise estimators (vad, hirsch, \
doblinger, mcra, mcra2)."
)]
pub struct Cli {
    /// Input file name
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output file name (default: <input>_enhanced.<ext>)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Duration of a speech frame in milliseconds, range 10-30
    #[arg(long = "frame-dur")]
    pub frame_dur: Option<u32>,

    /// Overlap of adjacent frames in percent, range 0-99
    #[arg(long)]
    pub overlap: Option<u32>,

    /// FFT size in range 0-2048, 0 selects the size automatically
    #[arg(long = "fft-size")]
    pub fft_size: Option<u32>,

    /// Downmix multichannel audio to mono
    #[arg(long)]
    pub downmix: bool,

    /// Window function: hamming, hann, blackman, bartlett, triangular,
    /// rectangular, nuttall
    #[arg(long)]
    pub window: Option<String>,

    /// Noise estimation algorithm: vad, hirsch, doblinger, mcra, mcra2
    #[arg(long = "noise-est")]
    pub noise_est: Option<String>,

    /// Sound enhancement algorithm: specsub, mmse, wiener-as, wiener-iter,
    /// residual
    #[arg(long = "snd-enhance")]
    pub snd_enhance: Option<String>,

    /// Load options from a configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Enable verbose operation
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Fully resolved run options.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    pub engine: EngineConfig,
    pub verbose: bool,
}

/// Layers the command line over the configuration file and the defaults.
pub fn resolve(cli: &Cli, file: &ConfigFile) -> Result<Options> {
    let input = match cli.input.clone().or_else(|| file.input_file.clone()) {
        Some(path) => path,
        None => bail!("no input file was specified"),
    };

    let output = cli
        .output
        .clone()
        .or_else(|| file.output_file.clone())
        .unwrap_or_else(|| derive_output_name(&input));

    if input == output {
        bail!("input and output file names are the same");
    }

    let defaults = EngineConfig::default();
    let engine = EngineConfig {
        frame_duration_ms: cli
            .frame_dur
            .or(file.frame_duration)
            .unwrap_or(defaults.frame_duration_ms),
        fft_size: cli.fft_size.or(file.fft_size).unwrap_or(defaults.fft_size),
        overlap_pct: cli.overlap.or(file.overlap).unwrap_or(defaults.overlap_pct),
        downmix: cli.downmix || file.downmix.unwrap_or(false),
        window: resolve_window(cli.window.as_deref().or(file.window.as_deref())),
        noise_estimator: resolve_estimator(
            cli.noise_est.as_deref().or(file.noise_estimation.as_deref()),
        ),
        enhancer: resolve_enhancer(
            cli.snd_enhance
                .as_deref()
                .or(file.sound_enhancement.as_deref()),
        ),
    };

    Ok(Options {
        input,
        output,
        engine,
        verbose: cli.verbose || file.verbose.unwrap_or(false),
    })
}

/// Appends `_enhanced` to the input file stem, keeping its extension.
pub fn derive_output_name(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) => {
            let mut name = input.file_stem().unwrap_or_default().to_os_string();
            name.push("_enhanced.");
            name.push(ext);
            input.with_file_name(name)
        }
        None => {
            let mut name = input.file_name().unwrap_or_default().to_os_string();
            name.push("_enhanced");
            input.with_file_name(name)
        }
    }
}

fn resolve_window(name: Option<&str>) -> WindowKind {
    match name {
        None => {
            log::info!("no window function was specified, using the default");
            WindowKind::default()
        }
        Some(n) => WindowKind::from_name(n).unwrap_or_else(|| {
            log::info!("unknown window function '{n}', using the default");
            WindowKind::default()
        }),
    }
}

fn resolve_estimator(name: Option<&str>) -> NoiseEstimatorKind {
    match name {
        None => {
            log::info!("no noise estimation algorithm was specified, using the default");
            NoiseEstimatorKind::default()
        }
        Some(n) => NoiseEstimatorKind::from_name(n).unwrap_or_else(|| {
            log::info!("unknown noise estimation algorithm '{n}', using the default");
            NoiseEstimatorKind::default()
        }),
    }
}

fn resolve_enhancer(name: Option<&str>) -> EnhancerKind {
    match name {
        None => {
            log::info!("no sound enhancement algorithm was specified, using the default");
            EnhancerKind::default()
        }
        Some(n) => EnhancerKind::from_name(n).unwrap_or_else(|| {
            log::info!("unknown sound enhancement algorithm '{n}', using the default");
            EnhancerKind::default()
        }),
    }
}
