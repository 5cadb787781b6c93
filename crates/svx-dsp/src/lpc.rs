//! Linear prediction via autocorrelation and Levinson-Durbin recursion
//!
//! Produces the coefficients of the order-M analysis filter
//! `A(z) = 1 + a_1 z^-1 + ... + a_M z^-M` (the leading 1 is implicit).
//! The all-pole spectral envelope of the frame is `1 / |A(e^jw)|^2`.

/// Fits order-`order` LPC coefficients to `data`.
///
/// A frame with no energy, or a recursion whose prediction error collapses
/// to zero, yields zero coefficients instead of NaN.
pub fn lpc_coefficients(data: &[f64], order: usize) -> Vec<f64> {
    let mut coeffs = vec![0.0; order];
    if data.len() <= order {
        return coeffs;
    }

    // Autocorrelation lags 0..=order.
    let mut aut = vec![0.0; order + 1];
    for (j, lag) in aut.iter_mut().enumerate() {
        let mut sum = 0.0;
        for i in 0..data.len() - j {
            sum += data[i] * data[i + j];
        }
        *lag = sum;
    }

    let mut error = aut[0];
    if error <= 0.0 {
        return coeffs;
    }

    for i in 0..order {
        let mut r = -aut[i + 1];
        for j in 0..i {
            r -= coeffs[j] * aut[i - j];
        }
        r /= error;
        coeffs[i] = r;

        for j in 0..i / 2 {
            let tmp = coeffs[j];
            coeffs[j] += r * coeffs[i - 1 - j];
            coeffs[i - 1 - j] += r * tmp;
        }
        if i % 2 == 1 {
            coeffs[i / 2] += coeffs[i / 2] * r;
        }

        error *= 1.0 - r * r;
        if error <= 0.0 {
            // Perfectly predictable signal; the remaining coefficients
            // cannot be estimated.
            for c in coeffs[i + 1..].iter_mut() {
                *c = 0.0;
            }
            break;
        }
    }

    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_noise(i: usize) -> f64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        i.hash(&mut hasher);
        (hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0
    }

    #[test]
    fn silent_frame_yields_zero_coefficients() {
        let coeffs = lpc_coefficients(&[0.0; 512], 12);
        assert_eq!(coeffs, vec![0.0; 12]);
    }

    #[test]
    fn short_frame_yields_zero_coefficients() {
        let coeffs = lpc_coefficients(&[1.0, -1.0], 12);
        assert_eq!(coeffs, vec![0.0; 12]);
    }

    #[test]
    fn recovers_ar2_process() {
        // x[n] = 0.5 x[n-1] - 0.25 x[n-2] + e[n] has the whitening filter
        // A(z) = 1 - 0.5 z^-1 + 0.25 z^-2.
        let n = 8192;
        let mut x = vec![0.0; n];
        for i in 0..n {
            let x1 = if i >= 1 { x[i - 1] } else { 0.0 };
            let x2 = if i >= 2 { x[i - 2] } else { 0.0 };
            x[i] = 0.5 * x1 - 0.25 * x2 + hash_noise(i);
        }

        let coeffs = lpc_coefficients(&x, 2);
        assert!((coeffs[0] - (-0.5)).abs() < 0.05, "a1 = {}", coeffs[0]);
        assert!((coeffs[1] - 0.25).abs() < 0.05, "a2 = {}", coeffs[1]);
    }

    #[test]
    fn coefficients_are_finite_for_tonal_input() {
        let x: Vec<f64> = (0..2048)
            .map(|i| (2.0 * std::f64::consts::PI * 0.01 * i as f64).sin())
            .collect();
        let coeffs = lpc_coefficients(&x, 12);
        assert!(coeffs.iter().all(|c| c.is_finite()));
    }
}
