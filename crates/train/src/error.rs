use std::error::Error as StdError;

use thiserror::Error;
use trellis_core::BatchError;

/// Errors that can occur during a training step.
///
/// A step that fails leaves the model untouched: gradients are validated
/// before any parameter is updated.
#[derive(Debug, Error)]
pub enum Error {
    #[error("model error: {0}")]
    Model(#[source] Box<dyn StdError + Send + Sync>),

    #[error("gradient error: {0}")]
    Gradient(#[source] Box<dyn StdError + Send + Sync>),

    #[error("gradient for {group} has {actual} entries, expected {expected}")]
    GradientShape {
        group: String,
        expected: usize,
        actual: usize,
    },

    #[error("gradient for unknown parameter group {group}")]
    UnknownGroup { group: String },

    #[error("example {index}: prediction has {prediction} values, target has {target}")]
    TargetLength {
        index: usize,
        prediction: usize,
        target: usize,
    },
}

impl Error {
    /// Converts a batch scoring failure.
    pub(crate) fn batch<E: StdError + Send + Sync + 'static>(err: BatchError<E>) -> Self {
        match err {
            BatchError::Model(err) => Self::model(err),
            BatchError::TargetLength {
                index,
                prediction,
                target,
            } => Self::TargetLength {
                index,
                prediction,
                target,
            },
        }
    }

    pub(crate) fn model<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Model(Box::new(err))
    }

    pub(crate) fn gradient<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Gradient(Box::new(err))
    }
}

/// Errors that can occur when validating training configuration.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("learning rate must be finite and positive")]
    LearningRate,

    #[error("momentum must be in [0, 1)")]
    Momentum,

    #[error("beta1 and beta2 must be in [0, 1)")]
    Beta,

    #[error("epsilon must be finite and positive")]
    Epsilon,

    #[error("batch size must be at least 1")]
    BatchSize,

    #[error("finite-difference step must be finite and positive")]
    Step,
}
