//! Reusable observers for Trellis training loops.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with any trainer whose events and actions implement them.
//!
//! # Modules
//!
//! - [`traits`]: Capability traits for training observers
//!   ([`HasLoss`], [`HasProgress`], [`CanStopEarly`])
//!
//! # Observers
//!
//! - [`EarlyStopping`]: stops when the loss stops improving
//! - [`LogObserver`]: reports progress through `tracing`
//! - [`LossHistory`]: keeps the loss curve for reporting
//!
//! [`Observer`]: trellis_core::Observer
//! [`HasLoss`]: traits::HasLoss
//! [`HasProgress`]: traits::HasProgress
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod traits;

mod early_stopping;
mod history;
mod log;

pub use early_stopping::{ConfigError, EarlyStopping};
pub use history::LossHistory;
pub use log::LogObserver;
