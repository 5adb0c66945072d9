//! Shape constraints for calibrators and lattice axes.
//!
//! A dimension's constraints are declared as a list of [`ShapeConstraint`]
//! tags and normalized into a [`ConstraintSpec`], which holds at most one
//! monotonicity, one curvature, and one set of bounds. Contradictory
//! declarations (increasing and decreasing, convex and concave, disjoint
//! bounds) are rejected when the [`ConstraintSpec`] is built, never at projection time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, InfeasibleConstraintError};

/// Direction of a monotonicity constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Monotonicity {
    /// Non-decreasing.
    Increasing,
    /// Non-increasing.
    Decreasing,
}

impl Monotonicity {
    /// Returns `1.0` for increasing and `-1.0` for decreasing.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Increasing => 1.0,
            Self::Decreasing => -1.0,
        }
    }
}

/// Direction of a curvature constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curvature {
    /// Non-decreasing slopes.
    Convex,
    /// Non-increasing slopes.
    Concave,
}

impl Curvature {
    /// Returns `1.0` for convex and `-1.0` for concave.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Convex => 1.0,
            Self::Concave => -1.0,
        }
    }
}

/// A closed interval `[lower, upper]`.
///
/// Either end may be infinite to express a one-sided bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundsRecord", into = "BoundsRecord")]
pub struct Bounds {
    lower: f64,
    upper: f64,
}

impl Bounds {
    /// Creates bounds, rejecting NaN ends and empty intervals.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NanBound`] if either end is NaN.
    /// - [`ConfigError::UnreachableBound`] if `lower` is positive infinity or
    ///   `upper` is negative infinity, leaving no finite value inside.
    /// - [`InfeasibleConstraintError::EmptyBounds`] if `lower > upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, Error> {
        if lower.is_nan() || upper.is_nan() {
            return Err(ConfigError::NanBound.into());
        }
        if (lower.is_infinite() && lower.is_sign_positive())
            || (upper.is_infinite() && upper.is_sign_negative())
        {
            return Err(ConfigError::UnreachableBound.into());
        }
        if lower > upper {
            return Err(InfeasibleConstraintError::EmptyBounds { lower, upper }.into());
        }
        Ok(Self { lower, upper })
    }

    /// Bounds with only a lower limit.
    ///
    /// # Errors
    ///
    /// Fails if `lower` is NaN or positive infinity.
    pub fn at_least(lower: f64) -> Result<Self, Error> {
        Self::new(lower, f64::INFINITY)
    }

    /// Bounds with only an upper limit.
    ///
    /// # Errors
    ///
    /// Fails if `upper` is NaN or negative infinity.
    pub fn at_most(upper: f64) -> Result<Self, Error> {
        Self::new(f64::NEG_INFINITY, upper)
    }

    /// The whole real line.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Returns the lower limit, `-inf` if open below.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Returns the upper limit, `+inf` if open above.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Returns `true` if both ends are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    /// Clamps a value into the interval.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    /// Returns how far a value lies outside the interval (zero if inside).
    #[must_use]
    pub fn excess(&self, value: f64) -> f64 {
        (self.lower - value).max(value - self.upper).max(0.0)
    }

    /// Intersects two intervals.
    ///
    /// # Errors
    ///
    /// Returns [`InfeasibleConstraintError::EmptyBounds`] if they do not overlap.
    pub fn intersect(&self, other: &Self) -> Result<Self, Error> {
        Self::new(self.lower.max(other.lower), self.upper.min(other.upper))
    }

    /// Returns a finite range suitable for initializing values.
    ///
    /// One-sided bounds are widened by `4.0` toward the open side, and
    /// unbounded intervals map to `[-2, 2]`.
    #[must_use]
    pub fn finite_range(&self) -> (f64, f64) {
        match (self.lower.is_finite(), self.upper.is_finite()) {
            (true, true) => (self.lower, self.upper),
            (true, false) => (self.lower, self.lower + 4.0),
            (false, true) => (self.upper - 4.0, self.upper),
            (false, false) => (-2.0, 2.0),
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Serialized form of [`Bounds`]; infinite ends are omitted.
#[derive(Serialize, Deserialize)]
struct BoundsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upper: Option<f64>,
}

impl From<Bounds> for BoundsRecord {
    fn from(bounds: Bounds) -> Self {
        Self {
            lower: bounds.lower.is_finite().then_some(bounds.lower),
            upper: bounds.upper.is_finite().then_some(bounds.upper),
        }
    }
}

impl TryFrom<BoundsRecord> for Bounds {
    type Error = Error;

    fn try_from(record: BoundsRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.lower.unwrap_or(f64::NEG_INFINITY),
            record.upper.unwrap_or(f64::INFINITY),
        )
    }
}

/// A single declared shape restriction on one input dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeConstraint {
    None,
    Increasing,
    Decreasing,
    Convex,
    Concave,
    Bounded(Bounds),
}

/// The normalized constraints of one dimension.
///
/// Immutable once built. Serializes as the list of [`ShapeConstraint`] tags
/// it was built from, and re-validates on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ShapeConstraint>", into = "Vec<ShapeConstraint>")]
pub struct ConstraintSpec {
    monotonicity: Option<Monotonicity>,
    curvature: Option<Curvature>,
    bounds: Option<Bounds>,
}

impl ConstraintSpec {
    /// Builds a constraint spec from a list of shape tags.
    ///
    /// Repeated tags are accepted; repeated bounds are intersected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Infeasible`] if the tags contradict each other.
    pub fn new(shapes: &[ShapeConstraint]) -> Result<Self, Error> {
        let mut spec = Self::default();
        for shape in shapes {
            match *shape {
                ShapeConstraint::None => {}
                ShapeConstraint::Increasing => spec.set_monotonicity(Monotonicity::Increasing)?,
                ShapeConstraint::Decreasing => spec.set_monotonicity(Monotonicity::Decreasing)?,
                ShapeConstraint::Convex => spec.set_curvature(Curvature::Convex)?,
                ShapeConstraint::Concave => spec.set_curvature(Curvature::Concave)?,
                ShapeConstraint::Bounded(bounds) => {
                    spec.bounds = Some(match spec.bounds {
                        Some(existing) => existing.intersect(&bounds)?,
                        None => bounds,
                    });
                }
            }
        }
        Ok(spec)
    }

    /// A spec with no constraints.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::default()
    }

    fn set_monotonicity(&mut self, direction: Monotonicity) -> Result<(), Error> {
        match self.monotonicity {
            Some(existing) if existing != direction => {
                Err(InfeasibleConstraintError::ConflictingMonotonicity.into())
            }
            _ => {
                self.monotonicity = Some(direction);
                Ok(())
            }
        }
    }

    fn set_curvature(&mut self, curvature: Curvature) -> Result<(), Error> {
        match self.curvature {
            Some(existing) if existing != curvature => {
                Err(InfeasibleConstraintError::ConflictingCurvature.into())
            }
            _ => {
                self.curvature = Some(curvature);
                Ok(())
            }
        }
    }

    /// Returns the declared direction, if any.
    #[must_use]
    pub fn monotonicity(&self) -> Option<Monotonicity> {
        self.monotonicity
    }

    /// Returns the declared curvature, if any.
    #[must_use]
    pub fn curvature(&self) -> Option<Curvature> {
        self.curvature
    }

    /// Returns the declared value bounds, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Returns `true` if no constraint is declared.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.monotonicity.is_none() && self.curvature.is_none() && self.bounds.is_none()
    }

    /// Returns the same spec with its bounds removed.
    #[must_use]
    pub fn without_bounds(&self) -> Self {
        Self {
            bounds: None,
            ..*self
        }
    }

    /// Returns the same spec, using `bounds` if none are declared.
    #[must_use]
    pub fn or_bounds(&self, bounds: Bounds) -> Self {
        Self {
            bounds: Some(self.bounds.unwrap_or(bounds)),
            ..*self
        }
    }

    /// Returns the shape tags this spec is equivalent to.
    #[must_use]
    pub fn shapes(&self) -> Vec<ShapeConstraint> {
        let mut shapes = Vec::with_capacity(3);
        match self.monotonicity {
            Some(Monotonicity::Increasing) => shapes.push(ShapeConstraint::Increasing),
            Some(Monotonicity::Decreasing) => shapes.push(ShapeConstraint::Decreasing),
            None => {}
        }
        match self.curvature {
            Some(Curvature::Convex) => shapes.push(ShapeConstraint::Convex),
            Some(Curvature::Concave) => shapes.push(ShapeConstraint::Concave),
            None => {}
        }
        if let Some(bounds) = self.bounds {
            shapes.push(ShapeConstraint::Bounded(bounds));
        }
        shapes
    }
}

impl From<ShapeConstraint> for ConstraintSpec {
    fn from(shape: ShapeConstraint) -> Self {
        // A single tag can never contradict itself.
        let mut spec = Self::default();
        match shape {
            ShapeConstraint::None => {}
            ShapeConstraint::Increasing => spec.monotonicity = Some(Monotonicity::Increasing),
            ShapeConstraint::Decreasing => spec.monotonicity = Some(Monotonicity::Decreasing),
            ShapeConstraint::Convex => spec.curvature = Some(Curvature::Convex),
            ShapeConstraint::Concave => spec.curvature = Some(Curvature::Concave),
            ShapeConstraint::Bounded(bounds) => spec.bounds = Some(bounds),
        }
        spec
    }
}

impl TryFrom<Vec<ShapeConstraint>> for ConstraintSpec {
    type Error = Error;

    fn try_from(shapes: Vec<ShapeConstraint>) -> Result<Self, Self::Error> {
        Self::new(&shapes)
    }
}

impl From<ConstraintSpec> for Vec<ShapeConstraint> {
    fn from(spec: ConstraintSpec) -> Self {
        spec.shapes()
    }
}

/// Slack allowed when checking stored parameters against their constraints.
pub(crate) const STORED_TOLERANCE: f64 = 1e-9;

/// Fails with [`ConfigError::ViolatedConstraints`] if `violations` is not empty.
pub(crate) fn ensure_satisfied(violations: Vec<Violation>) -> Result<(), Error> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ViolatedConstraints { violations }.into())
    }
}

/// A constraint that a set of parameters does not currently satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Some value exceeds the upper bound.
    AboveMaximum { max: f64 },

    /// Some value is below the lower bound.
    BelowMinimum { min: f64 },

    /// Adjacent values violate the declared direction; pairs are parameter indices.
    Monotonicity { pairs: Vec<(usize, usize)> },

    /// Slopes violate the declared curvature around these parameter indices.
    Curvature { indices: Vec<usize> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AboveMaximum { .. } => write!(f, "Max weight greater than output_max."),
            Self::BelowMinimum { .. } => write!(f, "Min weight less than output_min."),
            Self::Monotonicity { pairs } => write!(f, "Monotonicity violated at: {pairs:?}."),
            Self::Curvature { indices } => write!(f, "Curvature violated at: {indices:?}."),
        }
    }
}
