//! Analysis window family
//!
//! Each window yields a coefficient vector of the requested length together
//! with the sum of its coefficients - the windowing gain the overlap-add
//! driver normalizes against. Formulas follow the classic closed forms with
//! `n` in `[0, N-1]`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported analysis windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Hamming,
    Hann,
    Blackman,
    Bartlett,
    Triangular,
    Rectangular,
    Nuttall,
}

impl Default for WindowKind {
    fn default() -> Self {
        Self::Hamming
    }
}

impl WindowKind {
    /// Resolves a user-supplied name, `None` for unrecognized input.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hamming" => Some(Self::Hamming),
            "hann" => Some(Self::Hann),
            "blackman" => Some(Self::Blackman),
            "bartlett" => Some(Self::Bartlett),
            "triangular" => Some(Self::Triangular),
            "rectangular" => Some(Self::Rectangular),
            "nuttall" => Some(Self::Nuttall),
            _ => None,
        }
    }

    /// Human-readable label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hamming => "Hamming window",
            Self::Hann => "Hann window",
            Self::Blackman => "Blackman window",
            Self::Bartlett => "Bartlett window",
            Self::Triangular => "Triangular window",
            Self::Rectangular => "Rectangular window",
            Self::Nuttall => "Nuttall window",
        }
    }
}

/// A realized window: coefficients plus their sum.
#[derive(Debug, Clone)]
pub struct Window {
    kind: WindowKind,
    coeffs: Vec<f64>,
    gain: f64,
}

impl Window {
    /// Computes the coefficient vector for `kind` at length `len`.
    pub fn new(kind: WindowKind, len: usize) -> Self {
        let coeffs: Vec<f64> = (0..len).map(|n| coefficient(kind, n, len)).collect();
        let gain = coeffs.iter().sum();
        Self { kind, coeffs, gain }
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Sum of the coefficients; must be positive to serve as a divisor.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Multiplies the leading `self.len()` samples of `data` by the window.
    pub fn apply(&self, data: &mut [f64]) {
        for (s, &w) in data.iter_mut().zip(&self.coeffs) {
            *s *= w;
        }
    }
}

fn coefficient(kind: WindowKind, n: usize, len: usize) -> f64 {
    let n = n as f64;
    let len_f = len as f64;

    match kind {
        WindowKind::Hamming => 0.54 - 0.46 * (2.0 * PI * n / (len_f - 1.0)).cos(),
        WindowKind::Hann => 0.5 * (1.0 - (2.0 * PI * (n + 1.0) / (len_f + 1.0)).cos()),
        WindowKind::Blackman => {
            0.42 - 0.5 * (2.0 * PI * n / (len_f - 1.0)).cos()
                + 0.08 * (4.0 * PI * n / (len_f - 1.0)).cos()
        }
        WindowKind::Bartlett => {
            if len % 2 == 0 {
                if n <= len_f / 2.0 - 1.0 {
                    2.0 * n / (len_f - 1.0)
                } else {
                    2.0 * (len_f - n - 1.0) / (len_f - 1.0)
                }
            } else if n <= (len_f - 1.0) / 2.0 {
                2.0 * n / (len_f - 1.0)
            } else {
                2.0 - 2.0 * n / (len_f - 1.0)
            }
        }
        WindowKind::Triangular => {
            if len % 2 == 0 {
                if n <= len_f / 2.0 - 1.0 {
                    (2.0 * n + 1.0) / len_f
                } else {
                    (2.0 * (len_f - n) - 1.0) / len_f
                }
            } else if n <= (len_f - 1.0) / 2.0 {
                2.0 * (n + 1.0) / (len_f + 1.0)
            } else {
                2.0 * (len_f - n) / (len_f + 1.0)
            }
        }
        WindowKind::Rectangular => 1.0,
        WindowKind::Nuttall => {
            let scale = PI * n / (len_f - 1.0);
            0.355768 - 0.487396 * (2.0 * scale).cos() + 0.144232 * (4.0 * scale).cos()
                - 0.012604 * (6.0 * scale).cos()
        }
    }
}
