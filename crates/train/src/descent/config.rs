use crate::{error::ConfigError, optimizer::Optimizer};

/// Configuration for a [`fit`](super::fit) run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    epochs: usize,
    batch_size: usize,
    optimizer: Optimizer,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            optimizer: Optimizer::default(),
        }
    }
}

impl Config {
    /// Creates a new config.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::BatchSize`] if `batch_size` is zero.
    /// - Any [`ConfigError`] reported by [`Optimizer::validated`].
    pub fn new(epochs: usize, batch_size: usize, optimizer: Optimizer) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::BatchSize);
        }

        Ok(Self {
            epochs,
            batch_size,
            optimizer: optimizer.validated()?,
        })
    }

    /// Returns the number of passes over the examples.
    #[must_use]
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Returns the largest number of examples per step.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the update rule used for every step.
    #[must_use]
    pub fn optimizer(&self) -> Optimizer {
        self.optimizer
    }
}
