//! Shared models and datasets for the integration tests.

use trellis_core::Example;
use trellis_layers::{CalibratedModel, Feature, ShapeConstraint};

/// Deterministic samples of a target that rises with `x0` and falls with `x1`.
///
/// `x0` covers `[0, 10]`, `x1` covers `[0, 1]`, and targets stay in `[0, 2]`.
#[must_use]
pub fn monotone_dataset(count: usize) -> Vec<Example> {
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            let x0 = 10.0 * (i * 0.618_034).fract();
            let x1 = (i * 0.414_214 + 0.1).fract();
            let target = (x0 / 10.0).sqrt() + (1.0 - x1).powi(2);
            Example::scalar([x0, x1], target)
        })
        .collect()
}

/// A two-feature model: increasing in `x0`, decreasing and convex in `x1`.
///
/// # Panics
///
/// Panics if the fixed configuration is rejected, which would be a bug.
#[must_use]
pub fn monotone_model() -> CalibratedModel {
    CalibratedModel::builder()
        .feature(
            Feature::new([0.0, 2.5, 5.0, 7.5, 10.0], 2)
                .with_constraints(&[ShapeConstraint::Increasing])
                .unwrap(),
        )
        .feature(
            Feature::new([0.0, 0.25, 0.5, 0.75, 1.0], 3)
                .with_constraints(&[ShapeConstraint::Decreasing, ShapeConstraint::Convex])
                .unwrap(),
        )
        .build()
        .unwrap()
}

/// Evenly spaced points covering `[lower, upper]`.
#[must_use]
pub fn grid(lower: f64, upper: f64, count: usize) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let step = (upper - lower) / (count - 1) as f64;
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            lower + step * i
        })
        .collect()
}
