//! Per-example losses.
//!
//! Both losses average over output units, so a multi-unit model is scored on
//! the same scale as a single-unit one. An empty prediction has zero loss, and
//! a prediction whose length differs from its target scores NaN.

use trellis_core::Loss;

/// Mean squared error over output units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredError;

impl Loss for SquaredError {
    fn loss(&self, prediction: &[f64], target: &[f64]) -> f64 {
        mean(prediction, target, |p, t| (p - t).powi(2))
    }
}

/// Binary cross-entropy on logit predictions and `0`/`1` targets.
///
/// Evaluated in the stable form `max(z, 0) - z t + ln(1 + e^-|z|)`, so large
/// logits do not overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogLoss;

impl Loss for LogLoss {
    fn loss(&self, prediction: &[f64], target: &[f64]) -> f64 {
        mean(prediction, target, |z, t| {
            z.max(0.0) - z * t + (-z.abs()).exp().ln_1p()
        })
    }
}

fn mean(prediction: &[f64], target: &[f64], f: impl Fn(f64, f64) -> f64) -> f64 {
    if prediction.len() != target.len() {
        return f64::NAN;
    }
    let count = prediction.len();
    if count == 0 {
        return 0.0;
    }

    let total: f64 = prediction.iter().zip(target).map(|(&p, &t)| f(p, t)).sum();

    #[allow(clippy::cast_precision_loss)]
    let count = count as f64;
    total / count
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn squared_error_averages_units() {
        assert_relative_eq!(SquaredError.loss(&[1.0, 3.0], &[0.0, 0.0]), 5.0);
        assert_relative_eq!(SquaredError.loss(&[2.0], &[2.0]), 0.0);
        assert_relative_eq!(SquaredError.loss(&[], &[]), 0.0);
    }

    #[test]
    fn mismatched_lengths_score_nan() {
        assert!(SquaredError.loss(&[1.0, 100.0], &[1.0]).is_nan());
        assert!(LogLoss.loss(&[0.0], &[1.0, 0.0]).is_nan());
    }

    #[test]
    fn log_loss_matches_cross_entropy() {
        // sigmoid(0) = 0.5, so either label costs ln 2.
        assert_relative_eq!(LogLoss.loss(&[0.0], &[1.0]), 2.0_f64.ln());
        assert_relative_eq!(LogLoss.loss(&[0.0], &[0.0]), 2.0_f64.ln());

        let z: f64 = 1.5;
        let p = 1.0 / (1.0 + (-z).exp());
        assert_relative_eq!(LogLoss.loss(&[z], &[1.0]), -p.ln(), epsilon = 1e-12);
        assert_relative_eq!(LogLoss.loss(&[z], &[0.0]), -(1.0 - p).ln(), epsilon = 1e-12);
    }

    #[test]
    fn log_loss_is_stable_for_large_logits() {
        assert_relative_eq!(LogLoss.loss(&[1000.0], &[1.0]), 0.0);
        assert_relative_eq!(LogLoss.loss(&[-1000.0], &[1.0]), 1000.0);
    }
}
