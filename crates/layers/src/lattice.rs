//! Multilinear interpolation over a dense hyper-grid of learned values.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use trellis_core::ProjectionReport;

use crate::{
    error::{ConfigError, Error, InvariantViolation},
    projection::{ProjectionConfig, for_each_lane, project_grid},
    shape::{Bounds, ConstraintSpec, Monotonicity, STORED_TOLERANCE, Violation, ensure_satisfied},
};

/// How lattice vertex values are initialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeInit {
    /// A ramp rising along every monotonic axis (falling along decreasing ones).
    ///
    /// Each vertex takes the mean of its normalized positions along the
    /// monotonic axes, mapped into the output bounds (or `[0, 1]`). With no
    /// monotonic axes every vertex sits at the middle of that range.
    #[default]
    LinearRamp,

    /// Every vertex starts at the same value.
    Constant(f64),
}

/// A D-dimensional lattice with `units` outputs per vertex.
///
/// Vertex values are stored row-major with shape `[s_0, ..., s_{D-1}, units]`.
/// Coordinates are mapped from each axis's input range into `[0, s_d - 1]`
/// and clamped before interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatticeRecord", into = "LatticeRecord")]
pub struct Lattice {
    values: ArrayD<f64>,
    input_ranges: Vec<(f64, f64)>,
    axes: Vec<ConstraintSpec>,
    output_bounds: Option<Bounds>,
}

impl Lattice {
    /// Creates a lattice with all vertex values at zero.
    ///
    /// Every axis starts unconstrained with input range `[0, s_d - 1]`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoAxes`] if `sizes` is empty.
    /// - [`ConfigError::LatticeSizeTooSmall`] if any size is below 2.
    /// - [`ConfigError::NoUnits`] if `units` is zero.
    pub fn new(sizes: &[usize], units: usize) -> Result<Self, Error> {
        validate_shape(sizes, units)?;
        let mut shape = sizes.to_vec();
        shape.push(units);

        Ok(Self {
            values: ArrayD::zeros(IxDyn(&shape)),
            input_ranges: sizes.iter().map(|&s| identity_range(s)).collect(),
            axes: vec![ConstraintSpec::unconstrained(); sizes.len()],
            output_bounds: None,
        })
    }

    /// Creates a lattice from row-major vertex values.
    ///
    /// # Errors
    ///
    /// Fails like [`Lattice::new`], and with [`ConfigError::VertexCountMismatch`]
    /// or [`ConfigError::NonFiniteVertex`] if `values` is the wrong length or
    /// holds a non-finite value.
    pub fn from_values(sizes: &[usize], units: usize, values: Vec<f64>) -> Result<Self, Error> {
        let mut lattice = Self::new(sizes, units)?;
        let expected = lattice.values.len();
        if values.len() != expected {
            return Err(ConfigError::VertexCountMismatch {
                expected,
                actual: values.len(),
            }
            .into());
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteVertex { index }.into());
        }

        lattice.values = ArrayD::from_shape_vec(lattice.values.raw_dim(), values).map_err(|_| {
            ConfigError::VertexCountMismatch {
                expected,
                actual: 0,
            }
        })?;
        Ok(lattice)
    }

    /// Sets the shape constraints of one axis.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoSuchAxis`] if `axis` is out of range.
    /// - [`ConfigError::AxisBounds`] if `spec` carries bounds; vertex bounds
    ///   are set for the whole lattice with [`Lattice::with_output_bounds`].
    pub fn with_axis_constraints(mut self, axis: usize, spec: ConstraintSpec) -> Result<Self, Error> {
        self.check_axis(axis)?;
        if spec.bounds().is_some() {
            return Err(ConfigError::AxisBounds { axis }.into());
        }
        self.axes[axis] = spec;
        Ok(self)
    }

    /// Sets the input range of one axis.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoSuchAxis`] if `axis` is out of range.
    /// - [`ConfigError::InvalidInputRange`] if the range is empty or not finite.
    pub fn with_input_range(mut self, axis: usize, lower: f64, upper: f64) -> Result<Self, Error> {
        self.check_axis(axis)?;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(ConfigError::InvalidInputRange { axis }.into());
        }
        self.input_ranges[axis] = (lower, upper);
        Ok(self)
    }

    /// Bounds every vertex value.
    #[must_use]
    pub fn with_output_bounds(mut self, bounds: Bounds) -> Self {
        self.output_bounds = Some(bounds);
        self
    }

    /// Overwrites the vertex values using `init`.
    #[allow(clippy::cast_precision_loss)]
    pub fn initialize(&mut self, init: LatticeInit) {
        match init {
            LatticeInit::Constant(value) => self.values.fill(value),
            LatticeInit::LinearRamp => {
                let (lower, upper) = self
                    .output_bounds
                    .map_or((0.0, 1.0), |bounds| bounds.finite_range());
                let sizes = self.sizes().to_vec();
                let monotonic: Vec<(usize, Monotonicity)> = self
                    .axes
                    .iter()
                    .enumerate()
                    .filter_map(|(axis, spec)| spec.monotonicity().map(|m| (axis, m)))
                    .collect();

                for (index, value) in self.values.indexed_iter_mut() {
                    let position = if monotonic.is_empty() {
                        0.5
                    } else {
                        let total: f64 = monotonic
                            .iter()
                            .map(|&(axis, direction)| {
                                let t = index[axis] as f64 / (sizes[axis] - 1) as f64;
                                match direction {
                                    Monotonicity::Increasing => t,
                                    Monotonicity::Decreasing => 1.0 - t,
                                }
                            })
                            .sum();
                        total / monotonic.len() as f64
                    };
                    *value = lower + (upper - lower) * position;
                }
            }
        }
    }

    /// Evaluates the lattice, returning one value per output unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `coords.len()` differs from the
    /// number of axes.
    pub fn evaluate(&self, coords: &[f64]) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.units()];
        self.evaluate_into(coords, &mut out)?;
        Ok(out)
    }

    /// Evaluates the lattice into a caller-provided buffer of length `units`.
    ///
    /// Interpolation collapses one axis at a time, recursing over the two
    /// bracketing vertices of each axis. Exact grid coordinates follow a
    /// single branch, so they return the stored vertex value exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `coords` or `out` has the wrong
    /// length, and [`Error::Internal`] if a resolved vertex index leaves the
    /// grid.
    pub fn evaluate_into(&self, coords: &[f64], out: &mut [f64]) -> Result<(), Error> {
        let dims = self.dimensions();
        if coords.len() != dims {
            return Err(Error::DimensionMismatch {
                expected: dims,
                actual: coords.len(),
            });
        }
        if out.len() != self.units() {
            return Err(Error::DimensionMismatch {
                expected: self.units(),
                actual: out.len(),
            });
        }

        let cells = coords
            .iter()
            .enumerate()
            .map(|(axis, &x)| self.cell(axis, x))
            .collect::<Result<Vec<_>, _>>()?;

        let data = self
            .values
            .as_slice()
            .ok_or(InvariantViolation::NonContiguousStorage)?;
        let strides: Vec<usize> = self.values.strides().iter().map(|&s| s.unsigned_abs()).collect();

        for (unit, value) in out.iter_mut().enumerate() {
            *value = collapse(data, &strides, &cells, unit);
        }
        Ok(())
    }

    /// Resolves a coordinate on `axis` to a cell index and fraction.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn cell(&self, axis: usize, x: f64) -> Result<(usize, f64), Error> {
        let size = self.values.shape()[axis];
        let top = (size - 1) as f64;
        let (lower, upper) = self.input_ranges[axis];

        let scaled = ((x - lower) * top / (upper - lower)).clamp(0.0, top);
        let floor = scaled.floor();
        let (mut index, mut frac) = (floor as usize, scaled - floor);
        if index == size - 1 {
            index -= 1;
            frac = 1.0;
        }

        if index + 1 >= size {
            return Err(InvariantViolation::IndexOutOfRange {
                axis,
                index: index + 1,
                size,
            }
            .into());
        }
        Ok((index, frac))
    }

    /// Projects the vertex values onto the axis constraints and output bounds.
    pub fn project(&mut self, config: &ProjectionConfig) -> ProjectionReport {
        let shape = self.values.shape().to_vec();
        let axes = self.axes.clone();
        let bounds = self.output_bounds;
        project_grid(self.flat_mut(), &shape, &axes, bounds, config)
    }

    /// Lists every constraint the vertex values violate by more than `eps`.
    ///
    /// Indices in monotonicity pairs and curvature lists are flat positions
    /// in the row-major vertex storage.
    #[must_use]
    pub fn violations(&self, eps: f64) -> Vec<Violation> {
        let mut violations = Vec::new();
        let Some(values) = self.values.as_slice() else {
            return violations;
        };
        let shape = self.values.shape();

        if let Some(bounds) = self.output_bounds {
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

        for (axis, spec) in self.axes.iter().enumerate() {
            if let Some(direction) = spec.monotonicity() {
                let mut pairs = Vec::new();
                for_each_lane(shape, axis, |start, stride, len| {
                    for j in 1..len {
                        let (a, b) = (start + (j - 1) * stride, start + j * stride);
                        if direction.sign() * (values[b] - values[a]) < -eps {
                            pairs.push((a, b));
                        }
                    }
                });
                if !pairs.is_empty() {
                    pairs.sort_unstable();
                    violations.push(Violation::Monotonicity { pairs });
                }
            }

            if let Some(curvature) = spec.curvature() {
                let mut indices = Vec::new();
                for_each_lane(shape, axis, |start, stride, len| {
                    for j in 1..len.saturating_sub(1) {
                        let at = |k: usize| values[start + k * stride];
                        let bend = (at(j + 1) - at(j)) - (at(j) - at(j - 1));
                        if curvature.sign() * bend < -eps {
                            indices.push(start + j * stride);
                        }
                    }
                });
                if !indices.is_empty() {
                    indices.sort_unstable();
                    violations.push(Violation::Curvature { indices });
                }
            }
        }

        violations
    }

    /// Returns the per-axis grid sizes.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        let shape = self.values.shape();
        &shape[..shape.len() - 1]
    }

    /// Returns the number of axes.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.values.ndim() - 1
    }

    /// Returns the number of outputs per vertex.
    #[must_use]
    pub fn units(&self) -> usize {
        self.values.shape()[self.dimensions()]
    }

    /// Returns the vertex values with shape `[s_0, ..., s_{D-1}, units]`.
    #[must_use]
    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    /// Returns the raw input range mapped onto `axis`, or `None` past the last axis.
    #[must_use]
    pub fn input_range(&self, axis: usize) -> Option<(f64, f64)> {
        self.input_ranges.get(axis).copied()
    }

    /// Returns the shape constraints of `axis`, or `None` past the last axis.
    #[must_use]
    pub fn axis_constraints(&self, axis: usize) -> Option<&ConstraintSpec> {
        self.axes.get(axis)
    }

    /// Returns the bounds shared by every vertex value, if any.
    #[must_use]
    pub fn output_bounds(&self) -> Option<Bounds> {
        self.output_bounds
    }

    pub(crate) fn flat(&self) -> Option<&[f64]> {
        self.values.as_slice()
    }

    /// Returns the vertex values as one row-major slice.
    pub(crate) fn flat_mut(&mut self) -> &mut [f64] {
        if !self.values.is_standard_layout() {
            self.values = self.values.as_standard_layout().into_owned();
        }
        self.values.as_slice_mut().unwrap_or_default()
    }

    fn check_axis(&self, axis: usize) -> Result<(), Error> {
        if axis < self.dimensions() {
            Ok(())
        } else {
            Err(ConfigError::NoSuchAxis { axis }.into())
        }
    }
}

/// Interpolates the remaining axes of `cells` starting at `offset`.
fn collapse(data: &[f64], strides: &[usize], cells: &[(usize, f64)], offset: usize) -> f64 {
    let Some((&(index, frac), rest)) = cells.split_first() else {
        return data[offset];
    };
    let base = offset + index * strides[0];
    let strides_rest = &strides[1..];

    if frac == 0.0 {
        return collapse(data, strides_rest, rest, base);
    }
    let hi = collapse(data, strides_rest, rest, base + strides[0]);
    if frac == 1.0 {
        return hi;
    }
    let lo = collapse(data, strides_rest, rest, base);
    lo + frac * (hi - lo)
}

#[allow(clippy::cast_precision_loss)]
fn identity_range(size: usize) -> (f64, f64) {
    (0.0, (size - 1) as f64)
}

fn validate_shape(sizes: &[usize], units: usize) -> Result<(), Error> {
    if sizes.is_empty() {
        return Err(ConfigError::NoAxes.into());
    }
    if let Some((axis, &size)) = sizes.iter().enumerate().find(|&(_, &s)| s < 2) {
        return Err(ConfigError::LatticeSizeTooSmall { axis, size }.into());
    }
    if units == 0 {
        return Err(ConfigError::NoUnits.into());
    }
    Ok(())
}

/// Serialized form of a [`Lattice`].
///
/// Converting back re-runs every constructor check and rejects values that
/// break their own declared constraints.
#[derive(Serialize, Deserialize)]
struct LatticeRecord {
    sizes: Vec<usize>,
    units: usize,
    values: Vec<f64>,
    input_ranges: Vec<(f64, f64)>,
    #[serde(default)]
    axes: Vec<ConstraintSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_bounds: Option<Bounds>,
}

impl From<Lattice> for LatticeRecord {
    fn from(lattice: Lattice) -> Self {
        Self {
            sizes: lattice.sizes().to_vec(),
            units: lattice.units(),
            values: lattice.values.iter().copied().collect(),
            input_ranges: lattice.input_ranges,
            axes: lattice.axes,
            output_bounds: lattice.output_bounds,
        }
    }
}

impl TryFrom<LatticeRecord> for Lattice {
    type Error = Error;

    fn try_from(record: LatticeRecord) -> Result<Self, Self::Error> {
        let mut lattice = Self::from_values(&record.sizes, record.units, record.values)?;

        if record.input_ranges.len() != record.sizes.len() {
            return Err(Error::DimensionMismatch {
                expected: record.sizes.len(),
                actual: record.input_ranges.len(),
            });
        }
        for (axis, (lower, upper)) in record.input_ranges.into_iter().enumerate() {
            lattice = lattice.with_input_range(axis, lower, upper)?;
        }

        if record.axes.len() > record.sizes.len() {
            return Err(ConfigError::NoSuchAxis {
                axis: record.sizes.len(),
            }
            .into());
        }
        for (axis, spec) in record.axes.into_iter().enumerate() {
            lattice = lattice.with_axis_constraints(axis, spec)?;
        }

        if let Some(bounds) = record.output_bounds {
            lattice = lattice.with_output_bounds(bounds);
        }
        ensure_satisfied(lattice.violations(STORED_TOLERANCE))?;
        Ok(lattice)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::shape::ShapeConstraint;

    use super::*;

    fn increasing() -> ConstraintSpec {
        ShapeConstraint::Increasing.into()
    }

    /// Deterministic pseudo-random values in `[-5, 5)`.
    fn noise(count: usize, mut seed: u64) -> Vec<f64> {
        (0..count)
            .map(|_| {
                seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                #[allow(clippy::cast_precision_loss)]
                let unit = (seed >> 11) as f64 / (1_u64 << 53) as f64;
                unit * 10.0 - 5.0
            })
            .collect()
    }

    #[test]
    fn two_by_two_center_is_the_corner_average() {
        let lattice = Lattice::from_values(&[2, 2], 1, vec![0.0, 1.0, 1.0, 2.0]).unwrap();
        assert_relative_eq!(lattice.evaluate(&[0.5, 0.5]).unwrap()[0], 1.0);
        assert_relative_eq!(lattice.evaluate(&[0.0, 0.5]).unwrap()[0], 0.5);
        assert_relative_eq!(lattice.evaluate(&[1.0, 0.25]).unwrap()[0], 1.25);
    }

    #[test]
    fn vertices_of_a_cube_are_exact() {
        let values = noise(8, 7);
        let lattice = Lattice::from_values(&[2, 2, 2], 1, values.clone()).unwrap();

        for (flat, expected) in values.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let coords: Vec<f64> = [4, 2, 1]
                .iter()
                .map(|&stride| ((flat / stride) % 2) as f64)
                .collect();
            assert_eq!(lattice.evaluate(&coords).unwrap()[0], *expected);
        }
    }

    #[test]
    fn vertices_of_an_uneven_grid_are_exact() {
        let values = noise(3 * 4 * 2, 11);
        let lattice = Lattice::from_values(&[3, 4], 2, values.clone()).unwrap();

        for i in 0..3 {
            for j in 0..4 {
                let out = lattice.evaluate(&[f64::from(i), f64::from(j)]).unwrap();
                let base = usize::try_from(i * 8 + j * 2).unwrap();
                assert_eq!(out, &values[base..base + 2]);
            }
        }
    }

    #[test]
    fn interpolation_is_continuous_across_cell_boundaries() {
        let lattice = Lattice::from_values(&[3, 3], 1, noise(9, 3)).unwrap();
        let at = |x: f64, y: f64| lattice.evaluate(&[x, y]).unwrap()[0];

        for y in [0.0, 0.3, 1.0, 1.7] {
            let boundary = at(1.0, y);
            for delta in [1e-3, 1e-6, 1e-9] {
                let limit = 10.0 * delta;
                assert_relative_eq!(at(1.0 - delta, y), boundary, epsilon = limit);
                assert_relative_eq!(at(1.0 + delta, y), boundary, epsilon = limit);
            }
        }
    }

    #[test]
    fn constant_lattice_interpolates_to_the_constant() {
        let mut lattice = Lattice::new(&[2, 3, 4, 2, 3], 1).unwrap();
        lattice.initialize(LatticeInit::Constant(0.7));

        for coords in [[0.5, 1.2, 2.9, 0.1, 1.5], [1.0, 2.0, 3.0, 1.0, 2.0]] {
            assert_relative_eq!(lattice.evaluate(&coords).unwrap()[0], 0.7, epsilon = 1e-12);
        }
    }

    #[test]
    fn coordinates_are_rescaled_and_clamped() {
        let lattice = Lattice::from_values(&[3], 1, vec![0.0, 10.0, 40.0])
            .unwrap()
            .with_input_range(0, 10.0, 20.0)
            .unwrap();

        let at = |x: f64| lattice.evaluate(&[x]).unwrap()[0];
        assert_eq!(at(15.0), 10.0);
        assert_relative_eq!(at(17.5), 25.0);
        assert_eq!(at(-100.0), 0.0);
        assert_eq!(at(100.0), 40.0);
    }

    #[test]
    fn evaluate_into_fills_every_unit() {
        let lattice = Lattice::from_values(&[2], 3, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]).unwrap();
        let mut out = [0.0; 3];
        lattice.evaluate_into(&[0.5], &mut out).unwrap();
        assert_eq!(out, [5.0, 6.0, 7.0]);

        let mut short = [0.0; 2];
        assert_eq!(
            lattice.evaluate_into(&[0.5], &mut short).unwrap_err(),
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn wrong_coordinate_count_is_a_dimension_mismatch() {
        let lattice = Lattice::new(&[2, 2], 1).unwrap();
        assert_eq!(
            lattice.evaluate(&[0.5]).unwrap_err(),
            Error::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            Lattice::new(&[], 1).unwrap_err(),
            Error::Config(ConfigError::NoAxes)
        );
        assert_eq!(
            Lattice::new(&[2, 1], 1).unwrap_err(),
            Error::Config(ConfigError::LatticeSizeTooSmall { axis: 1, size: 1 })
        );
        assert_eq!(
            Lattice::new(&[2], 0).unwrap_err(),
            Error::Config(ConfigError::NoUnits)
        );
        assert_eq!(
            Lattice::from_values(&[2, 2], 1, vec![0.0; 3]).unwrap_err(),
            Error::Config(ConfigError::VertexCountMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            Lattice::from_values(&[2], 1, vec![0.0, f64::NAN]).unwrap_err(),
            Error::Config(ConfigError::NonFiniteVertex { index: 1 })
        );

        let lattice = Lattice::new(&[2, 2], 1).unwrap();
        assert_eq!(
            lattice.clone().with_axis_constraints(2, increasing()).unwrap_err(),
            Error::Config(ConfigError::NoSuchAxis { axis: 2 })
        );
        let bounded = ShapeConstraint::Bounded(Bounds::new(0.0, 1.0).unwrap()).into();
        assert_eq!(
            lattice.clone().with_axis_constraints(0, bounded).unwrap_err(),
            Error::Config(ConfigError::AxisBounds { axis: 0 })
        );
        assert_eq!(
            lattice.with_input_range(1, 1.0, 1.0).unwrap_err(),
            Error::Config(ConfigError::InvalidInputRange { axis: 1 })
        );
    }

    #[test]
    fn linear_ramp_follows_monotonic_axes() {
        let decreasing = ShapeConstraint::Decreasing.into();
        let mut lattice = Lattice::new(&[3, 2, 2], 1)
            .unwrap()
            .with_axis_constraints(0, increasing())
            .unwrap()
            .with_axis_constraints(2, decreasing)
            .unwrap()
            .with_output_bounds(Bounds::new(-1.0, 1.0).unwrap());

        lattice.initialize(LatticeInit::LinearRamp);

        assert!(lattice.violations(0.0).is_empty());
        assert_relative_eq!(lattice.evaluate(&[0.0, 0.0, 1.0]).unwrap()[0], -1.0);
        assert_relative_eq!(lattice.evaluate(&[2.0, 1.0, 0.0]).unwrap()[0], 1.0);
        assert_relative_eq!(lattice.evaluate(&[1.0, 0.0, 0.5]).unwrap()[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn violations_use_flat_indices() {
        // 2 x 3 grid, one unit, increasing along axis 1.
        let lattice = Lattice::from_values(&[2, 3], 1, vec![0.0, 2.0, 1.0, 0.0, 1.0, 2.0])
            .unwrap()
            .with_axis_constraints(1, increasing())
            .unwrap()
            .with_output_bounds(Bounds::new(0.0, 1.5).unwrap());

        let messages: Vec<String> = lattice
            .violations(1e-9)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            [
                "Max weight greater than output_max.",
                "Monotonicity violated at: [(1, 2)].",
            ]
        );
    }

    #[test]
    fn projection_restores_every_monotonic_axis() {
        let mut lattice = Lattice::from_values(&[3, 3, 2], 2, noise(36, 5))
            .unwrap()
            .with_axis_constraints(0, increasing())
            .unwrap()
            .with_axis_constraints(1, ShapeConstraint::Decreasing.into())
            .unwrap()
            .with_axis_constraints(2, increasing())
            .unwrap()
            .with_output_bounds(Bounds::new(-2.0, 2.0).unwrap());

        let report = lattice.project(&ProjectionConfig::default());

        assert!(report.max_violation < 1e-12, "{report:?}");
        assert!(lattice.violations(1e-12).is_empty());
    }

    #[test]
    fn projection_handles_convex_axes() {
        let mut lattice = Lattice::from_values(&[4, 2], 1, noise(8, 9))
            .unwrap()
            .with_axis_constraints(0, ShapeConstraint::Convex.into())
            .unwrap();

        let report = lattice.project(&ProjectionConfig::default());

        assert!(report.max_violation < 1e-9, "{report:?}");
        assert!(lattice.violations(1e-9).is_empty());
    }

    #[test]
    fn serde_round_trip_preserves_evaluation() {
        let mut lattice = Lattice::new(&[3, 2], 2)
            .unwrap()
            .with_axis_constraints(0, increasing())
            .unwrap()
            .with_input_range(1, -1.0, 1.0)
            .unwrap()
            .with_output_bounds(Bounds::at_least(0.0).unwrap());
        lattice.initialize(LatticeInit::LinearRamp);

        let json = serde_json::to_string(&lattice).unwrap();
        let restored: Lattice = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, lattice);
        for coords in [[0.3, -0.2], [1.7, 0.9], [2.0, 1.0]] {
            assert_eq!(
                restored.evaluate(&coords).unwrap(),
                lattice.evaluate(&coords).unwrap()
            );
        }
    }

    #[test]
    fn deserializing_values_that_break_their_constraints_fails() {
        let json = r#"{
            "sizes": [2], "units": 1, "values": [5.0, -3.0],
            "input_ranges": [[0.0, 1.0]], "axes": [["increasing"]]
        }"#;
        let err = serde_json::from_str::<Lattice>(json).unwrap_err();
        assert!(err.to_string().contains("violate"), "{err}");

        let bounded = r#"{
            "sizes": [2], "units": 1, "values": [0.0, 2.0],
            "input_ranges": [[0.0, 1.0]], "output_bounds": {"upper": 1.0}
        }"#;
        assert!(serde_json::from_str::<Lattice>(bounded).is_err());
    }

    #[test]
    fn deserializing_a_short_value_list_fails() {
        let json = r#"{"sizes": [2, 2], "units": 1, "values": [0.0, 1.0], "input_ranges": [[0.0, 1.0], [0.0, 1.0]]}"#;
        assert!(serde_json::from_str::<Lattice>(json).is_err());
    }
}
