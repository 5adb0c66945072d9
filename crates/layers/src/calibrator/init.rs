use serde::{Deserialize, Serialize};

use crate::shape::{ConstraintSpec, Monotonicity};

/// How a calibrator's keypoint outputs are initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibratorInit {
    /// Outputs equal the keypoint inputs, then projected onto the constraints.
    Identity,

    /// Outputs evenly spaced by keypoint index across the output range.
    #[default]
    EqualHeights,

    /// Outputs proportional to the input position across the output range.
    EqualSlopes,
}

impl CalibratorInit {
    /// Computes initial outputs for the given keypoint inputs.
    ///
    /// The ramp spans the constraint bounds (see
    /// [`Bounds::finite_range`](crate::shape::Bounds::finite_range)) and runs
    /// downward for decreasing specs. `inputs` must hold at least two strictly
    /// increasing values.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn outputs(self, inputs: &[f64], spec: &ConstraintSpec) -> Vec<f64> {
        let last = inputs.len() - 1;
        let positions: Vec<f64> = match self {
            Self::Identity => return inputs.to_vec(),
            Self::EqualHeights => (0..=last).map(|i| i as f64 / last as f64).collect(),
            Self::EqualSlopes => {
                let span = inputs[last] - inputs[0];
                inputs.iter().map(|x| (x - inputs[0]) / span).collect()
            }
        };

        let (lower, upper) = spec.bounds().unwrap_or_default().finite_range();
        positions
            .into_iter()
            .map(|p| match spec.monotonicity() {
                Some(Monotonicity::Decreasing) => upper - (upper - lower) * p,
                _ => lower + (upper - lower) * p,
            })
            .collect()
    }
}
