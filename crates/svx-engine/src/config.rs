//! Engine configuration and the configuration file format
//!
//! [`EngineConfig`] is the validated parameter set the pipeline is built
//! from. [`ConfigFile`] mirrors the line-oriented configuration file: one
//! `<key> <value>` pair per line, comments starting with `#`, `;` or `//`,
//! booleans spelled `yes|true|no|false`. Unknown keys are diagnosed and
//! skipped; they never abort the parse.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use svx_denoise::{EnhancerKind, NoiseEstimatorKind};
use svx_dsp::WindowKind;

use crate::error::{EngineError, EngineResult};

/// Maximum supported FFT transform size.
pub const FFT_MAX: usize = 2048;

/// Validated engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Analysis frame length in milliseconds, 10 to 30.
    pub frame_duration_ms: u32,
    /// FFT size, 0 for automatic sizing.
    pub fft_size: u32,
    /// Frame overlap percentage, 0 to 99.
    pub overlap_pct: u32,
    /// Mix multi-channel input down to mono.
    pub downmix: bool,
    /// Analysis window.
    pub window: WindowKind,
    /// Noise estimation algorithm.
    pub noise_estimator: NoiseEstimatorKind,
    /// Sound enhancement algorithm.
    pub enhancer: EnhancerKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: 20,
            fft_size: 0,
            overlap_pct: 50,
            downmix: false,
            window: WindowKind::default(),
            noise_estimator: NoiseEstimatorKind::default(),
            enhancer: EnhancerKind::default(),
        }
    }
}

impl EngineConfig {
    /// Range-checks the user-settable integers.
    pub fn validate(&self) -> EngineResult<()> {
        check_range("frame duration", self.frame_duration_ms, 10, 30)?;
        check_range("fft size", self.fft_size, 0, FFT_MAX as u32)?;
        check_range("overlap percentage", self.overlap_pct, 0, 99)?;
        Ok(())
    }
}

fn check_range(name: &str, value: u32, lower: u32, upper: u32) -> EngineResult<()> {
    if value < lower || value > upper {
        return Err(EngineError::InvalidConfig(format!(
            "'{name}' must be in range [{lower}, {upper}], got {value}"
        )));
    }
    Ok(())
}

/// Raw options as read from a configuration file. Everything is optional;
/// the caller layers these under any command-line values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub frame_duration: Option<u32>,
    pub overlap: Option<u32>,
    pub fft_size: Option<u32>,
    pub window: Option<String>,
    pub noise_estimation: Option<String>,
    pub sound_enhancement: Option<String>,
    pub downmix: Option<bool>,
    pub verbose: Option<bool>,
}

impl ConfigFile {
    /// Loads and parses a configuration file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            EngineError::ReadError(format!(
                "could not open config file '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self::parse(&text, &path.display().to_string()))
    }

    /// Parses configuration text; `origin` names the source in diagnostics.
    pub fn parse(text: &str, origin: &str) -> Self {
        let mut config = Self::default();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with(';')
                || line.starts_with("//")
            {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k, unquote(v.trim())),
                None => {
                    log::warn!(
                        "unknown configuration statement on line {} of {origin}: \"{line}\"",
                        lineno + 1
                    );
                    continue;
                }
            };

            if !config.apply(key, value) {
                log::warn!(
                    "unknown configuration statement on line {} of {origin}: \"{line}\"",
                    lineno + 1
                );
            }
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) -> bool {
        match key {
            "input_file" => self.input_file = Some(PathBuf::from(value)),
            "output_file" => self.output_file = Some(PathBuf::from(value)),
            "frame_duration" => self.frame_duration = parse_int(key, value),
            "overlap" => self.overlap = parse_int(key, value),
            "fft_size" => self.fft_size = parse_int(key, value),
            "window" => self.window = Some(value.to_string()),
            "noise_estimation" => self.noise_estimation = Some(value.to_string()),
            "sound_enhancement" => self.sound_enhancement = Some(value.to_string()),
            "downmix" => self.downmix = parse_bool(key, value),
            "verbose" => self.verbose = parse_bool(key, value),
            _ => return false,
        }
        true
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_int(key: &str, value: &str) -> Option<u32> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("invalid integer value \"{value}\" for option \"{key}\"");
            None
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => {
            log::warn!("unknown boolean value \"{value}\" for option \"{key}\"");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_frame_duration_is_rejected() {
        let config = EngineConfig {
            frame_duration_ms: 40,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn out_of_range_overlap_is_rejected() {
        let config = EngineConfig {
            overlap_pct: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_fft_is_rejected() {
        let config = EngineConfig {
            fft_size: 4096,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_keys_comments_and_blanks() {
        let text = "\
# comment
; another comment
// and another

input_file noisy.wav
output_file clean.wav
frame_duration 25
overlap 75
fft_size 1024
window blackman
noise_estimation mcra
sound_enhancement mmse
downmix yes
verbose no
";
        let config = ConfigFile::parse(text, "test");
        assert_eq!(config.input_file, Some(PathBuf::from("noisy.wav")));
        assert_eq!(config.output_file, Some(PathBuf::from("clean.wav")));
        assert_eq!(config.frame_duration, Some(25));
        assert_eq!(config.overlap, Some(75));
        assert_eq!(config.fft_size, Some(1024));
        assert_eq!(config.window.as_deref(), Some("blackman"));
        assert_eq!(config.noise_estimation.as_deref(), Some("mcra"));
        assert_eq!(config.sound_enhancement.as_deref(), Some("mmse"));
        assert_eq!(config.downmix, Some(true));
        assert_eq!(config.verbose, Some(false));
    }

    #[test]
    fn unknown_keys_do_not_abort_the_parse() {
        let text = "frobnicate 7\nframe_duration 15\n";
        let config = ConfigFile::parse(text, "test");
        assert_eq!(config.frame_duration, Some(15));
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let config = ConfigFile::parse("input_file \"my file.wav\"\n", "test");
        assert_eq!(config.input_file, Some(PathBuf::from("my file.wav")));
    }

    #[test]
    fn bad_boolean_is_skipped() {
        let config = ConfigFile::parse("downmix maybe\n", "test");
        assert_eq!(config.downmix, None);
    }

    #[test]
    fn out_of_range_file_value_fails_validation() {
        // A config file carrying frame_duration 40 must be rejected once it
        // reaches validation.
        let file = ConfigFile::parse("frame_duration 40\n", "test");
        let config = EngineConfig {
            frame_duration_ms: file.frame_duration.unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
