use thiserror::Error;

use crate::shape::Violation;

/// Errors produced by calibrators, lattices, and calibrated models.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The layer or model was configured incorrectly.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The declared shape constraints contradict each other.
    #[error(transparent)]
    Infeasible(#[from] InfeasibleConstraintError),

    /// An input had the wrong number of dimensions.
    #[error("expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An internal invariant was broken; this indicates a defect, not bad input.
    #[error("internal invariant violated: {0}")]
    Internal(#[from] InvariantViolation),
}

/// A configuration problem detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("a calibrator needs at least 2 keypoints, got {count}")]
    TooFewKeypoints { count: usize },

    #[error("keypoint inputs must be strictly increasing (index {index})")]
    KeypointsNotIncreasing { index: usize },

    #[error("keypoint {index} is not finite")]
    NonFiniteKeypoint { index: usize },

    #[error("expected {expected} keypoint outputs, got {actual}")]
    OutputCountMismatch { expected: usize, actual: usize },

    #[error("calibrator output {index} is not finite")]
    NonFiniteOutput { index: usize },

    #[error("the missing-input sentinel must be finite")]
    NonFiniteMissingInput,

    #[error("no finite values to place keypoints on")]
    EmptyInputs,

    #[error("bounds must not be NaN")]
    NanBound,

    #[error("lattice needs at least one axis")]
    NoAxes,

    #[error("lattice axis {axis} has size {size}, but every axis needs at least 2 vertices")]
    LatticeSizeTooSmall { axis: usize, size: usize },

    #[error("lattice needs at least one output unit")]
    NoUnits,

    #[error("expected {expected} lattice vertex values, got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },

    #[error("lattice vertex value {index} is not finite")]
    NonFiniteVertex { index: usize },

    #[error("lattice axis {axis} has an empty or non-finite input range")]
    InvalidInputRange { axis: usize },

    #[error("lattice axis {axis} does not exist")]
    NoSuchAxis { axis: usize },

    #[error("lattice axis constraints cannot carry bounds (axis {axis})")]
    AxisBounds { axis: usize },

    #[error("projection tolerance must be finite and non-negative")]
    Tolerance,

    #[error("projection needs at least one iteration")]
    Iterations,

    #[error("a model needs at least one feature")]
    NoFeatures,

    #[error("bounds must admit a finite value")]
    UnreachableBound,

    #[error("stored values violate their declared constraints: {violations:?}")]
    ViolatedConstraints { violations: Vec<Violation> },
}

/// Two or more declared shape constraints cannot be satisfied together.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum InfeasibleConstraintError {
    #[error("a dimension cannot be both increasing and decreasing")]
    ConflictingMonotonicity,

    #[error("a dimension cannot be both convex and concave")]
    ConflictingCurvature,

    #[error("bounds [{lower}, {upper}] are empty")]
    EmptyBounds { lower: f64, upper: f64 },
}

/// A defect signal raised when code reaches a state it should never reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvariantViolation {
    #[error("resolved vertex index {index} is outside axis {axis} of size {size}")]
    IndexOutOfRange {
        axis: usize,
        index: usize,
        size: usize,
    },

    #[error("lattice vertex storage is not contiguous")]
    NonContiguousStorage,
}
