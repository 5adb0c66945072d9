//! Epoch loop for projected gradient descent.
//!
//! [`fit`] walks the examples in order, in contiguous mini-batches of
//! [`Config::batch_size`], and runs one [`Trainer::train_step`] per batch.
//! Shuffling, if wanted, is up to the caller.
//!
//! # Observer Events
//!
//! After every step the observer receives an [`Event`] holding the step
//! report and a reference to the updated model. Returning
//! [`Action::StopEarly`] ends training with [`Status::StoppedByObserver`].
//!
//! # Example
//!
//! ```no_run
//! use trellis_core::Example;
//! use trellis_layers::{CalibratedModel, Feature, ShapeConstraint};
//! use trellis_train::{FiniteDifference, Optimizer, SquaredError, descent};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut model = CalibratedModel::builder()
//!     .feature(
//!         Feature::new([0.0, 5.0, 10.0], 3)
//!             .with_constraints(&[ShapeConstraint::Increasing])?,
//!     )
//!     .build()?;
//! let examples: Vec<Example> = (0..=10)
//!     .map(|i| Example::scalar([f64::from(i)], f64::from(i).sqrt()))
//!     .collect();
//!
//! let config = descent::Config::new(50, 4, Optimizer::adam(0.01)?)?;
//! let solution = descent::fit_unobserved(
//!     &mut model,
//!     &examples,
//!     &SquaredError,
//!     &FiniteDifference::default(),
//!     &config,
//! )?;
//! assert_eq!(solution.status, descent::Status::Complete);
//! # Ok(())
//! # }
//! ```

mod action;
mod config;
mod event;
mod solution;


pub use action::Action;
pub use config::Config;
pub use event::Event;
pub use solution::{Solution, Status};

use trellis_core::{Example, GradientProvider, Loss, Model, Observer, Parameterized, Projectable};

use crate::{error::Error, trainer::Trainer};

/// Trains a model with projected gradient descent.
///
/// # Errors
///
/// Returns the first [`Error`] raised by a training step. Steps already
/// taken are kept; the model is feasible either way.
pub fn fit<M, L, G, Obs>(
    model: &mut M,
    examples: &[Example],
    loss: &L,
    provider: &G,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    M: Model<Input = [f64], Output = Vec<f64>> + Parameterized + Projectable,
    L: Loss + ?Sized,
    G: GradientProvider<M>,
    Obs: for<'a> Observer<Event<'a, M>, Action>,
{
    let mut trainer = Trainer::new(config.optimizer());
    let mut epoch_losses = Vec::with_capacity(config.epochs());
    let mut step = 0;

    for epoch in 0..config.epochs() {
        let mut total = 0.0;

        for batch in examples.chunks(config.batch_size()) {
            let report = trainer.train_step(model, batch, loss, provider)?;
            step += 1;

            #[allow(clippy::cast_precision_loss)]
            let weight = batch.len() as f64;
            total += weight * report.loss;

            tracing::debug!(
                epoch,
                step,
                loss = report.loss,
                gradient_max = report.gradient_max,
                "training step"
            );

            let event = Event {
                epoch,
                step,
                batch_size: batch.len(),
                report,
                model: &*model,
            };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                return Ok(Solution {
                    status: Status::StoppedByObserver,
                    epochs: epoch,
                    steps: step,
                    epoch_losses,
                });
            }
        }

        let epoch_loss = if examples.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let count = examples.len() as f64;
            total / count
        };
        tracing::debug!(epoch, loss = epoch_loss, "epoch complete");
        epoch_losses.push(epoch_loss);
    }

    Ok(Solution {
        status: Status::Complete,
        epochs: config.epochs(),
        steps: step,
        epoch_losses,
    })
}

/// Trains a model without observation.
///
/// This is a convenience wrapper around [`fit`] that discards events.
///
/// # Errors
///
/// Same as [`fit`].
pub fn fit_unobserved<M, L, G>(
    model: &mut M,
    examples: &[Example],
    loss: &L,
    provider: &G,
    config: &Config,
) -> Result<Solution, Error>
where
    M: Model<Input = [f64], Output = Vec<f64>> + Parameterized + Projectable,
    L: Loss + ?Sized,
    G: GradientProvider<M>,
{
    fit(model, examples, loss, provider, config, ())
}
