//! Core traits and types for the Trellis framework.
//!
//! This crate defines the shared abstractions that layers, trainers, and
//! observers build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Observer`]: receives trainer events and optionally returns control actions
//! - [`Parameterized`]: exposes learnable parameter groups by identity
//! - [`Projectable`]: restores feasibility of constrained parameters
//! - [`GradientProvider`]: the external collaborator that computes gradients
//! - [`Loss`]: scores a prediction against a target

mod gradient;
mod model;
mod observer;
mod params;

pub use gradient::{BatchError, Example, GradientProvider, Gradients, Loss, batch_loss};
pub use model::Model;
pub use observer::Observer;
pub use params::{Parameterized, Projectable, ProjectionReport};
