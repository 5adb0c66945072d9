use trellis_core::Projectable;

use crate::{
    calibrator::{Calibrator, CalibratorInit, Interpolation, quantiles},
    error::{ConfigError, Error},
    lattice::{Lattice, LatticeInit},
    projection::ProjectionConfig,
    shape::{Bounds, ConstraintSpec, ShapeConstraint},
};

use super::CalibratedModel;

/// Declares one input dimension of a [`CalibratedModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    keypoints: Vec<f64>,
    lattice_size: usize,
    constraints: ConstraintSpec,
    init: CalibratorInit,
    interpolation: Interpolation,
    missing_input: Option<f64>,
}

impl Feature {
    /// Declares a feature calibrated on fixed keypoints.
    ///
    /// The lattice axis for this feature has `lattice_size` vertices.
    #[must_use]
    pub fn new(keypoints: impl Into<Vec<f64>>, lattice_size: usize) -> Self {
        Self {
            keypoints: keypoints.into(),
            lattice_size,
            constraints: ConstraintSpec::unconstrained(),
            init: CalibratorInit::default(),
            interpolation: Interpolation::default(),
            missing_input: None,
        }
    }

    /// Declares a feature with keypoints at evenly spaced quantiles of a column.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyInputs`] if `samples` has no finite values.
    /// Keypoint counts are checked when the model is built.
    pub fn from_quantiles(
        samples: &[f64],
        num_keypoints: usize,
        lattice_size: usize,
    ) -> Result<Self, Error> {
        let keypoints = if num_keypoints < 2 {
            Vec::new()
        } else {
            quantiles(samples, num_keypoints)?
        };
        Ok(Self::new(keypoints, lattice_size))
    }

    /// Declares the feature's shape constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Infeasible`] if the constraints contradict each other.
    pub fn with_constraints(mut self, shapes: &[ShapeConstraint]) -> Result<Self, Error> {
        self.constraints = ConstraintSpec::new(shapes)?;
        Ok(self)
    }

    /// Sets how the calibrator outputs are initialized.
    #[must_use]
    pub fn with_init(mut self, init: CalibratorInit) -> Self {
        self.init = init;
        self
    }

    /// Sets the calibrator interpolation between keypoints.
    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Maps `value` (and NaN) to a learned output instead of calibrating it.
    #[must_use]
    pub fn with_missing_input(mut self, value: f64) -> Self {
        self.missing_input = Some(value);
        self
    }

    /// Returns the constraints declared for this feature.
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSpec {
        &self.constraints
    }

    /// Builds this feature's calibrator and its lattice axis constraints.
    ///
    /// The calibrator's output range is its declared bounds, defaulting to
    /// `[0, lattice_size - 1]`. Monotonic features get an increasing lattice
    /// axis; the calibrator carries the direction.
    #[allow(clippy::cast_precision_loss)]
    fn build(self, axis: usize) -> Result<(Calibrator, ConstraintSpec), Error> {
        if self.lattice_size < 2 {
            return Err(ConfigError::LatticeSizeTooSmall {
                axis,
                size: self.lattice_size,
            }
            .into());
        }

        let default_bounds = Bounds::new(0.0, (self.lattice_size - 1) as f64)?;
        let spec = self.constraints.or_bounds(default_bounds);

        let mut calibrator = Calibrator::with_init(self.keypoints, spec, self.init)?
            .with_interpolation(self.interpolation);
        if let Some(value) = self.missing_input {
            calibrator = calibrator.with_missing_input(value)?;
        }

        let axis_spec = if spec.monotonicity().is_some() {
            ShapeConstraint::Increasing.into()
        } else {
            ConstraintSpec::unconstrained()
        };
        Ok((calibrator, axis_spec))
    }
}

/// Builder for [`CalibratedModel`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    features: Vec<Feature>,
    units: Option<usize>,
    lattice_init: LatticeInit,
    lattice_bounds: Option<Bounds>,
    output_calibrator: Option<Calibrator>,
    projection: ProjectionConfig,
}

impl ModelBuilder {
    /// Adds an input dimension; dimensions are ordered as added.
    #[must_use]
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Sets the number of lattice outputs per vertex (default 1).
    #[must_use]
    pub fn units(mut self, units: usize) -> Self {
        self.units = Some(units);
        self
    }

    /// Sets how lattice vertex values start out.
    #[must_use]
    pub fn lattice_init(mut self, init: LatticeInit) -> Self {
        self.lattice_init = init;
        self
    }

    /// Bounds every lattice vertex value.
    #[must_use]
    pub fn lattice_bounds(mut self, bounds: Bounds) -> Self {
        self.lattice_bounds = Some(bounds);
        self
    }

    /// Applies `calibrator` to each lattice output unit.
    #[must_use]
    pub fn output_calibrator(mut self, calibrator: Calibrator) -> Self {
        self.output_calibrator = Some(calibrator);
        self
    }

    /// Sets the projection settings stored in the model.
    #[must_use]
    pub fn projection(mut self, config: ProjectionConfig) -> Self {
        self.projection = config;
        self
    }

    /// Builds the model.
    ///
    /// Calibrators and the lattice are initialized and projected, so the new
    /// model satisfies every declared constraint.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoFeatures`] if no feature was added.
    /// - Any [`Error::Config`] or [`Error::Infeasible`] raised while building
    ///   a calibrator or the lattice.
    pub fn build(self) -> Result<CalibratedModel, Error> {
        if self.features.is_empty() {
            return Err(ConfigError::NoFeatures.into());
        }

        let sizes: Vec<usize> = self.features.iter().map(|f| f.lattice_size).collect();
        let mut calibrators = Vec::with_capacity(self.features.len());
        let mut axis_specs = Vec::with_capacity(self.features.len());
        for (axis, feature) in self.features.into_iter().enumerate() {
            let (calibrator, axis_spec) = feature.build(axis)?;
            calibrators.push(calibrator);
            axis_specs.push(axis_spec);
        }

        let mut lattice = Lattice::new(&sizes, self.units.unwrap_or(1))?;
        for (axis, (calibrator, axis_spec)) in calibrators.iter().zip(axis_specs).enumerate() {
            let (lower, upper) = calibrator.spec().bounds().unwrap_or_default().finite_range();
            lattice = lattice
                .with_input_range(axis, lower, upper)?
                .with_axis_constraints(axis, axis_spec)?;
        }
        if let Some(bounds) = self.lattice_bounds {
            lattice = lattice.with_output_bounds(bounds);
        }
        lattice.initialize(self.lattice_init);

        let mut model = CalibratedModel::from_parts(
            calibrators,
            lattice,
            self.output_calibrator,
            self.projection,
        )?;
        model.project();
        Ok(model)
    }
}
