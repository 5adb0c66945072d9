//! Capability traits for training observers.
//!
//! These traits abstract over trainer-specific event and action types, so
//! observers can be written once and reused with any training loop.
//!
//! # Event traits
//!
//! - [`HasLoss`]: events that carry a loss value
//! - [`HasProgress`]: events that know their epoch and step
//!
//! # Action traits
//!
//! - [`CanStopEarly`]: actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use trellis_core::Observer;
//! use trellis_observers::traits::{CanStopEarly, HasLoss};
//!
//! struct GoodEnough {
//!     target: f64,
//! }
//!
//! impl<E: HasLoss, A: CanStopEarly> Observer<E, A> for GoodEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.loss() < self.target).then(A::stop_early)
//!     }
//! }
//! ```

use trellis_train::descent;

/// An event that carries a loss value.
pub trait HasLoss {
    /// Returns the loss reported by this event.
    fn loss(&self) -> f64;
}

/// An event that knows where it sits in a training run.
pub trait HasProgress {
    /// Returns the zero-based epoch index.
    fn epoch(&self) -> usize;

    /// Returns the one-based step count across all epochs.
    fn step(&self) -> usize;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops training early.
    fn stop_early() -> Self;
}

// --- descent::Event ---

impl<M> HasLoss for descent::Event<'_, M> {
    fn loss(&self) -> f64 {
        self.report.loss
    }
}

impl<M> HasProgress for descent::Event<'_, M> {
    fn epoch(&self) -> usize {
        self.epoch
    }

    fn step(&self) -> usize {
        self.step
    }
}

// --- descent::Action ---

impl CanStopEarly for descent::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
