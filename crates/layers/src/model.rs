//! Calibrated lattice models.
//!
//! A [`CalibratedModel`] runs each raw feature through its own calibrator,
//! interpolates the lattice at the calibrated coordinates, and optionally
//! applies an output calibrator to every lattice unit.

mod builder;

pub use builder::{Feature, ModelBuilder};

use serde::{Deserialize, Serialize};
use trellis_core::{Model, Parameterized, Projectable, ProjectionReport};

use crate::{
    calibrator::Calibrator,
    error::{ConfigError, Error},
    lattice::Lattice,
    projection::ProjectionConfig,
    shape::{ConstraintSpec, Violation},
};

/// Identifies one learnable parameter group of a [`CalibratedModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamGroup {
    /// Keypoint outputs of the calibrator for one input dimension.
    Calibrator(usize),
    /// The learned output for missing values of one input dimension.
    MissingOutput(usize),
    /// Lattice vertex values, row-major.
    Lattice,
    /// Keypoint outputs of the output calibrator.
    OutputCalibrator,
}

/// A calibrated lattice model.
///
/// Owns its calibrators, lattice, and optional output calibrator
/// exclusively; parameters are only reachable through this model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelRecord", into = "ModelRecord")]
pub struct CalibratedModel {
    calibrators: Vec<Calibrator>,
    lattice: Lattice,
    output: Option<Calibrator>,
    projection: ProjectionConfig,
}

impl CalibratedModel {
    /// Returns a builder for a new model.
    #[must_use]
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Assembles a model from already-built parts.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoFeatures`] if `calibrators` is empty.
    /// - [`Error::DimensionMismatch`] if the lattice does not have one axis
    ///   per calibrator.
    pub fn from_parts(
        calibrators: Vec<Calibrator>,
        lattice: Lattice,
        output: Option<Calibrator>,
        projection: ProjectionConfig,
    ) -> Result<Self, Error> {
        if calibrators.is_empty() {
            return Err(ConfigError::NoFeatures.into());
        }
        if lattice.dimensions() != calibrators.len() {
            return Err(Error::DimensionMismatch {
                expected: calibrators.len(),
                actual: lattice.dimensions(),
            });
        }

        Ok(Self {
            calibrators,
            lattice,
            output,
            projection,
        })
    }

    /// Evaluates the model on one raw feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `features` does not hold one
    /// value per input dimension.
    pub fn forward(&self, features: &[f64]) -> Result<Vec<f64>, Error> {
        if features.len() != self.calibrators.len() {
            return Err(Error::DimensionMismatch {
                expected: self.calibrators.len(),
                actual: features.len(),
            });
        }

        let coords: Vec<f64> = self
            .calibrators
            .iter()
            .zip(features)
            .map(|(calibrator, &x)| calibrator.evaluate(x))
            .collect();

        let mut outputs = self.lattice.evaluate(&coords)?;
        if let Some(output) = &self.output {
            for value in &mut outputs {
                *value = output.evaluate(*value);
            }
        }
        Ok(outputs)
    }

    /// Lists constraint violations larger than `eps`, by parameter group.
    #[must_use]
    pub fn violations(&self, eps: f64) -> Vec<(ParamGroup, Violation)> {
        let calibrators = self
            .calibrators
            .iter()
            .enumerate()
            .flat_map(|(i, c)| {
                c.violations(eps)
                    .into_iter()
                    .map(move |v| (ParamGroup::Calibrator(i), v))
            });
        let lattice = self
            .lattice
            .violations(eps)
            .into_iter()
            .map(|v| (ParamGroup::Lattice, v));
        let output = self
            .output
            .iter()
            .flat_map(|c| c.violations(eps))
            .map(|v| (ParamGroup::OutputCalibrator, v));

        calibrators.chain(lattice).chain(output).collect()
    }

    /// Returns the number of input dimensions.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.calibrators.len()
    }

    /// Returns the constraint spec of one input dimension.
    #[must_use]
    pub fn constraint(&self, dimension: usize) -> Option<&ConstraintSpec> {
        self.calibrators.get(dimension).map(Calibrator::spec)
    }

    /// Returns the input calibrators, one per feature.
    #[must_use]
    pub fn calibrators(&self) -> &[Calibrator] {
        &self.calibrators
    }

    /// Returns the lattice the calibrated features index into.
    #[must_use]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Returns the calibrator applied to every lattice output, if any.
    #[must_use]
    pub fn output_calibrator(&self) -> Option<&Calibrator> {
        self.output.as_ref()
    }

    /// Returns the settings used by [`Projectable::project`].
    #[must_use]
    pub fn projection_config(&self) -> &ProjectionConfig {
        &self.projection
    }
}

impl Model for CalibratedModel {
    type Input = [f64];
    type Output = Vec<f64>;
    type Error = Error;

    fn call(&self, input: &[f64]) -> Result<Vec<f64>, Error> {
        self.forward(input)
    }
}

impl Parameterized for CalibratedModel {
    type Id = ParamGroup;

    fn param_ids(&self) -> Vec<ParamGroup> {
        let mut ids = Vec::with_capacity(2 * self.calibrators.len() + 2);
        for (i, calibrator) in self.calibrators.iter().enumerate() {
            ids.push(ParamGroup::Calibrator(i));
            if calibrator.missing_input().is_some() {
                ids.push(ParamGroup::MissingOutput(i));
            }
        }
        ids.push(ParamGroup::Lattice);
        if self.output.is_some() {
            ids.push(ParamGroup::OutputCalibrator);
        }
        ids
    }

    fn params(&self, id: ParamGroup) -> Option<&[f64]> {
        match id {
            ParamGroup::Calibrator(i) => self.calibrators.get(i).map(Calibrator::outputs),
            ParamGroup::MissingOutput(i) => self
                .calibrators
                .get(i)
                .and_then(Calibrator::missing_output_ref)
                .map(std::slice::from_ref),
            ParamGroup::Lattice => self.lattice.flat(),
            ParamGroup::OutputCalibrator => self.output.as_ref().map(Calibrator::outputs),
        }
    }

    fn params_mut(&mut self, id: ParamGroup) -> Option<&mut [f64]> {
        match id {
            ParamGroup::Calibrator(i) => self.calibrators.get_mut(i).map(Calibrator::outputs_mut),
            ParamGroup::MissingOutput(i) => self
                .calibrators
                .get_mut(i)
                .and_then(Calibrator::missing_output_mut)
                .map(std::slice::from_mut),
            ParamGroup::Lattice => Some(self.lattice.flat_mut()),
            ParamGroup::OutputCalibrator => self.output.as_mut().map(Calibrator::outputs_mut),
        }
    }
}

impl Projectable for CalibratedModel {
    fn project(&mut self) -> ProjectionReport {
        let config = self.projection;

        let report = self
            .calibrators
            .iter_mut()
            .chain(self.output.iter_mut())
            .map(|calibrator| calibrator.project(&config))
            .fold(ProjectionReport::trivial(), ProjectionReport::merge)
            .merge(self.lattice.project(&config));

        tracing::debug!(
            iterations = report.iterations,
            converged = report.converged,
            max_violation = report.max_violation,
            "projected model parameters"
        );
        report
    }
}

/// Serialized form of a [`CalibratedModel`].
#[derive(Serialize, Deserialize)]
struct ModelRecord {
    calibrators: Vec<Calibrator>,
    lattice: Lattice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_calibrator: Option<Calibrator>,
    #[serde(default)]
    projection: ProjectionConfig,
}

impl From<CalibratedModel> for ModelRecord {
    fn from(model: CalibratedModel) -> Self {
        Self {
            calibrators: model.calibrators,
            lattice: model.lattice,
            output_calibrator: model.output,
            projection: model.projection,
        }
    }
}

impl TryFrom<ModelRecord> for CalibratedModel {
    type Error = Error;

    fn try_from(record: ModelRecord) -> Result<Self, Self::Error> {
        Self::from_parts(
            record.calibrators,
            record.lattice,
            record.output_calibrator,
            record.projection,
        )
    }
}
