//! Projected gradient descent for Trellis models.
//!
//! Every training step follows the same order: gradients from a
//! [`GradientProvider`], one optimizer update, then one projection pass
//! through [`Projectable`]. A model handed to this crate is feasible whenever
//! control returns to the caller.
//!
//! - [`Trainer`]: single and sharded steps with explicit optimizer state
//! - [`descent`]: the epoch loop with observer events
//! - [`Optimizer`]: SGD, momentum, and Adam update rules
//! - [`SquaredError`], [`LogLoss`]: per-example losses
//! - [`FiniteDifference`]: a reference gradient provider
//!
//! [`GradientProvider`]: trellis_core::GradientProvider
//! [`Projectable`]: trellis_core::Projectable

pub mod descent;

mod error;
mod finite_difference;
mod loss;
mod optimizer;
mod trainer;

#[cfg(test)]
mod fixtures;

pub use error::{ConfigError, Error};
pub use finite_difference::FiniteDifference;
pub use loss::{LogLoss, SquaredError};
pub use optimizer::{Optimizer, OptimizerState, ParamState};
pub use trainer::{StepReport, Trainer};
