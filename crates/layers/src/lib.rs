//! Shape-constrained calibration and lattice layers.
//!
//! - [`Calibrator`]: per-feature piecewise-linear keypoint calibration
//! - [`Lattice`]: multilinear interpolation over a learned hyper-grid
//! - [`projection`]: L2-nearest projection onto monotonicity, curvature,
//!   and bound constraints
//! - [`CalibratedModel`]: calibrators composed with a lattice, trainable
//!   through the `trellis-core` traits

mod calibrator;
mod error;
mod lattice;
mod model;
mod shape;

pub mod projection;

pub use calibrator::{Calibrator, CalibratorInit, Interpolation, MissingInput};
pub use error::{ConfigError, Error, InfeasibleConstraintError, InvariantViolation};
pub use lattice::{Lattice, LatticeInit};
pub use model::{CalibratedModel, Feature, ModelBuilder, ParamGroup};
pub use projection::{ProjectionConfig, ProjectionStrategy};
pub use shape::{Bounds, ConstraintSpec, Curvature, Monotonicity, ShapeConstraint, Violation};
