use thiserror::Error;
use trellis_core::Observer;

use crate::traits::{CanStopEarly, HasLoss};

/// Stops training once the loss stops improving.
///
/// A step improves when its loss is below the best loss seen so far by more
/// than `min_delta`. After `patience` consecutive steps without improvement
/// the observer returns the stop action. NaN losses never improve.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: f64,
    stale: usize,
}

/// Errors that can occur when configuring [`EarlyStopping`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("patience must be at least 1")]
    Patience,

    #[error("min_delta must be finite and non-negative")]
    MinDelta,
}

impl EarlyStopping {
    /// Creates an early-stopping observer.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Patience`] if `patience` is zero.
    /// - [`ConfigError::MinDelta`] if `min_delta` is negative or non-finite.
    pub fn new(patience: usize, min_delta: f64) -> Result<Self, ConfigError> {
        if patience == 0 {
            return Err(ConfigError::Patience);
        }
        if !min_delta.is_finite() || min_delta < 0.0 {
            return Err(ConfigError::MinDelta);
        }

        Ok(Self {
            patience,
            min_delta,
            best: f64::INFINITY,
            stale: 0,
        })
    }

    /// Returns the best loss seen so far.
    #[must_use]
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Returns the number of consecutive steps without improvement.
    #[must_use]
    pub fn stale_steps(&self) -> usize {
        self.stale
    }

    /// Feeds one loss value and reports whether training should stop.
    pub fn update(&mut self, loss: f64) -> bool {
        if loss < self.best - self.min_delta {
            self.best = loss;
            self.stale = 0;
        } else {
            self.stale += 1;
        }

        if self.stale >= self.patience {
            tracing::info!(best = self.best, patience = self.patience, "stopping early");
            return true;
        }
        false
    }
}

impl<E: HasLoss, A: CanStopEarly> Observer<E, A> for EarlyStopping {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.update(event.loss()).then(A::stop_early)
    }
}

/// Allows `&mut EarlyStopping` to be passed to trainers that take an observer
/// by value, so its state can be inspected afterwards.
impl<E: HasLoss, A: CanStopEarly> Observer<E, A> for &mut EarlyStopping {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.update(event.loss()).then(A::stop_early)
    }
}
