//! Piecewise-linear keypoint calibrators.
//!
//! A calibrator maps one raw feature value to a calibrated value through a
//! sequence of `(input, output)` keypoints. Inputs are fixed at construction;
//! outputs are learned and kept inside the calibrator's [`ConstraintSpec`] by
//! [`Calibrator::project`].

mod init;

pub use init::CalibratorInit;

use serde::{Deserialize, Serialize};
use trellis_core::ProjectionReport;

use crate::{
    error::{ConfigError, Error},
    projection::{ProjectionConfig, project_sequence},
    shape::{ConstraintSpec, STORED_TOLERANCE, Violation, ensure_satisfied},
};

/// How a calibrator interpolates between keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear between neighbouring keypoints.
    #[default]
    Linear,

    /// Holds the output of the keypoint at or left of the input.
    Constant,
}

/// Missing-input handling: a sentinel value mapped to a learned output.
///
/// NaN inputs are always treated as missing when this is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingInput {
    pub value: f64,
    pub output: f64,
}

/// A learned 1-D piecewise-linear calibration function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalibratorRecord", into = "CalibratorRecord")]
pub struct Calibrator {
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    spec: ConstraintSpec,
    interpolation: Interpolation,
    missing: Option<MissingInput>,
}

impl Calibrator {
    /// Creates a calibrator from explicit keypoints.
    ///
    /// The outputs are taken as given; call [`Calibrator::project`] to move
    /// them onto `spec` if they might not satisfy it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if there are fewer than two keypoints, if the
    /// inputs are not finite and strictly increasing, or if an output is not
    /// finite or the output count differs from the input count.
    pub fn new(inputs: Vec<f64>, outputs: Vec<f64>, spec: ConstraintSpec) -> Result<Self, Error> {
        validate_inputs(&inputs)?;
        if outputs.len() != inputs.len() {
            return Err(ConfigError::OutputCountMismatch {
                expected: inputs.len(),
                actual: outputs.len(),
            }
            .into());
        }
        if let Some(index) = outputs.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteOutput { index }.into());
        }

        Ok(Self {
            inputs,
            outputs,
            spec,
            interpolation: Interpolation::default(),
            missing: None,
        })
    }

    /// Creates a calibrator on fixed keypoint inputs with initialized outputs.
    ///
    /// The initialized outputs are projected onto `spec`, so the result is
    /// always feasible.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the inputs are invalid (see [`Calibrator::new`]).
    pub fn with_init(
        inputs: Vec<f64>,
        spec: ConstraintSpec,
        init: CalibratorInit,
    ) -> Result<Self, Error> {
        validate_inputs(&inputs)?;
        let outputs = init.outputs(&inputs, &spec);
        let mut calibrator = Self::new(inputs, outputs, spec)?;
        calibrator.project(&ProjectionConfig::default());
        Ok(calibrator)
    }

    /// Creates a calibrator with keypoints at evenly spaced quantiles of `samples`.
    ///
    /// Non-finite samples are ignored and repeated quantiles collapse into a
    /// single keypoint, so the result may have fewer than `num_keypoints`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::TooFewKeypoints`] if `num_keypoints < 2` or fewer than
    ///   two distinct keypoints remain.
    /// - [`ConfigError::EmptyInputs`] if `samples` has no finite values.
    pub fn from_quantiles(
        samples: &[f64],
        num_keypoints: usize,
        spec: ConstraintSpec,
        init: CalibratorInit,
    ) -> Result<Self, Error> {
        if num_keypoints < 2 {
            return Err(ConfigError::TooFewKeypoints {
                count: num_keypoints,
            }
            .into());
        }

        let inputs = quantiles(samples, num_keypoints)?;
        if inputs.len() < 2 {
            return Err(ConfigError::TooFewKeypoints {
                count: inputs.len(),
            }
            .into());
        }

        Self::with_init(inputs, spec, init)
    }

    /// Sets the interpolation between keypoints.
    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Maps `value` (and NaN) to a separately learned output.
    ///
    /// The missing output starts at the middle of the initial output range
    /// and is clamped to the constraint bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonFiniteMissingInput`] if `value` is not finite.
    pub fn with_missing_input(mut self, value: f64) -> Result<Self, Error> {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteMissingInput.into());
        }
        let (lower, upper) = self.spec.bounds().unwrap_or_default().finite_range();
        self.missing = Some(MissingInput {
            value,
            output: 0.5 * (lower + upper),
        });
        Ok(self)
    }

    /// Evaluates the calibrator.
    ///
    /// Inputs outside the keypoint range clamp to the boundary outputs.
    /// Missing inputs return the missing output; NaN without missing-input
    /// handling returns NaN.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        if let Some(missing) = self.missing {
            if x.is_nan() || x == missing.value {
                return missing.output;
            }
        }
        if x.is_nan() {
            return f64::NAN;
        }

        let last = self.inputs.len() - 1;
        let upper = self.inputs.partition_point(|&k| k <= x);
        if upper == 0 {
            return self.outputs[0];
        }
        if upper > last {
            return self.outputs[last];
        }

        let i = upper - 1;
        match self.interpolation {
            Interpolation::Constant => self.outputs[i],
            Interpolation::Linear => {
                let t = (x - self.inputs[i]) / (self.inputs[i + 1] - self.inputs[i]);
                self.outputs[i] + t * (self.outputs[i + 1] - self.outputs[i])
            }
        }
    }

    /// Projects the outputs (and the missing output) onto the constraints.
    pub fn project(&mut self, config: &ProjectionConfig) -> ProjectionReport {
        let report = project_sequence(&self.inputs, &mut self.outputs, &self.spec, config);
        if let (Some(missing), Some(bounds)) = (self.missing.as_mut(), self.spec.bounds()) {
            missing.output = bounds.clamp(missing.output);
        }
        report
    }

    /// Lists every constraint the outputs violate by more than `eps`.
    ///
    /// Bound violations come first, then monotonicity, then curvature.
    #[must_use]
    pub fn violations(&self, eps: f64) -> Vec<Violation> {
        let mut violations = Vec::new();
        let outputs = &self.outputs;

        if let Some(bounds) = self.spec.bounds() {
            let mut values = outputs.clone();
            values.extend(self.missing.map(|m| m.output));
            if values.iter().any(|v| *v > bounds.upper() + eps) {
                violations.push(Violation::AboveMaximum {
                    max: bounds.upper(),
                });
            }
            if values.iter().any(|v| *v < bounds.lower() - eps) {
                violations.push(Violation::BelowMinimum {
                    min: bounds.lower(),
                });
            }
        }

        if let Some(direction) = self.spec.monotonicity() {
            let pairs: Vec<(usize, usize)> = (1..outputs.len())
                .filter(|&i| direction.sign() * (outputs[i] - outputs[i - 1]) < -eps)
                .map(|i| (i - 1, i))
                .collect();
            if !pairs.is_empty() {
                violations.push(Violation::Monotonicity { pairs });
            }
        }

        if let Some(curvature) = self.spec.curvature() {
            let slope = |i: usize| {
                (outputs[i + 1] - outputs[i]) / (self.inputs[i + 1] - self.inputs[i])
            };
            let indices: Vec<usize> = (1..outputs.len().saturating_sub(1))
                .filter(|&i| curvature.sign() * (slope(i) - slope(i - 1)) < -eps)
                .collect();
            if !indices.is_empty() {
                violations.push(Violation::Curvature { indices });
            }
        }

        violations
    }

    /// Returns the keypoint inputs.
    #[must_use]
    pub fn keypoints(&self) -> &[f64] {
        &self.inputs
    }

    /// Returns the learned keypoint outputs.
    #[must_use]
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [f64] {
        &mut self.outputs
    }

    /// Returns the constraints the outputs are projected onto.
    #[must_use]
    pub fn spec(&self) -> &ConstraintSpec {
        &self.spec
    }

    /// Returns how values between keypoints are interpolated.
    #[must_use]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Returns the missing-input configuration, if any.
    #[must_use]
    pub fn missing_input(&self) -> Option<MissingInput> {
        self.missing
    }

    pub(crate) fn missing_output_mut(&mut self) -> Option<&mut f64> {
        self.missing.as_mut().map(|m| &mut m.output)
    }

    pub(crate) fn missing_output_ref(&self) -> Option<&f64> {
        self.missing.as_ref().map(|m| &m.output)
    }

    /// Returns the number of keypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Always `false`; a calibrator has at least two keypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

fn validate_inputs(inputs: &[f64]) -> Result<(), Error> {
    if inputs.len() < 2 {
        return Err(ConfigError::TooFewKeypoints {
            count: inputs.len(),
        }
        .into());
    }
    if let Some(index) = inputs.iter().position(|v| !v.is_finite()) {
        return Err(ConfigError::NonFiniteKeypoint { index }.into());
    }
    if let Some(index) = (1..inputs.len()).find(|&i| inputs[i] <= inputs[i - 1]) {
        return Err(ConfigError::KeypointsNotIncreasing { index }.into());
    }
    Ok(())
}

/// Evenly spaced quantiles of the finite samples, with duplicates removed.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn quantiles(samples: &[f64], count: usize) -> Result<Vec<f64>, Error> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(ConfigError::EmptyInputs.into());
    }
    sorted.sort_by(f64::total_cmp);

    let last = (sorted.len() - 1) as f64;
    let mut keypoints: Vec<f64> = (0..count)
        .map(|j| {
            let position = last * j as f64 / (count - 1) as f64;
            let lower = position.floor();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (i, frac) = (lower as usize, position - lower);
            match sorted.get(i + 1) {
                Some(next) if frac > 0.0 => sorted[i] + frac * (next - sorted[i]),
                _ => sorted[i],
            }
        })
        .collect();
    keypoints.dedup();
    Ok(keypoints)
}

/// Serialized form of a [`Calibrator`].
///
/// Converting back re-runs every constructor check and rejects values that
/// break their own declared constraints.
#[derive(Serialize, Deserialize)]
struct CalibratorRecord {
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    #[serde(default)]
    constraints: ConstraintSpec,
    #[serde(default)]
    interpolation: Interpolation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    missing: Option<MissingInput>,
}

impl From<Calibrator> for CalibratorRecord {
    fn from(calibrator: Calibrator) -> Self {
        Self {
            inputs: calibrator.inputs,
            outputs: calibrator.outputs,
            constraints: calibrator.spec,
            interpolation: calibrator.interpolation,
            missing: calibrator.missing,
        }
    }
}

impl TryFrom<CalibratorRecord> for Calibrator {
    type Error = Error;

    fn try_from(record: CalibratorRecord) -> Result<Self, Self::Error> {
        let mut calibrator = Self::new(record.inputs, record.outputs, record.constraints)?
            .with_interpolation(record.interpolation);
        if let Some(missing) = record.missing {
            if !missing.value.is_finite() {
                return Err(ConfigError::NonFiniteMissingInput.into());
            }
            if !missing.output.is_finite() {
                return Err(ConfigError::NonFiniteOutput {
                    index: calibrator.len(),
                }
                .into());
            }
            calibrator.missing = Some(missing);
        }
        ensure_satisfied(calibrator.violations(STORED_TOLERANCE))?;
        Ok(calibrator)
    }
}
