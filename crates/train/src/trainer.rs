use std::{fmt::Debug, hash::Hash};

use trellis_core::{
    Example, GradientProvider, Gradients, Loss, Model, Parameterized, Projectable,
    ProjectionReport, batch_loss,
};

use crate::{
    error::Error,
    optimizer::{Optimizer, OptimizerState},
};

/// Summary of one training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Mean batch loss before the update.
    pub loss: f64,

    /// Largest absolute gradient entry.
    pub gradient_max: f64,

    /// Projection performed after the update.
    pub projection: ProjectionReport,
}

impl StepReport {
    fn skipped() -> Self {
        Self {
            loss: 0.0,
            gradient_max: 0.0,
            projection: ProjectionReport::trivial(),
        }
    }
}

/// Projected gradient descent driver.
///
/// Owns the optimizer rule and its per-group state. Every step runs
/// gradient, update, then projection, so a model passed to
/// [`train_step`](Self::train_step) satisfies its constraints whenever the
/// call returns, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct Trainer<Id: Eq + Hash> {
    optimizer: Optimizer,
    state: OptimizerState<Id>,
}

impl<Id: Copy + Eq + Hash + Debug> Trainer<Id> {
    /// Creates a trainer with empty optimizer state.
    #[must_use]
    pub fn new(optimizer: Optimizer) -> Self {
        Self {
            optimizer,
            state: OptimizerState::new(),
        }
    }

    /// Returns the update rule applied to every parameter group.
    #[must_use]
    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    /// Returns the optimizer state, keyed by parameter group.
    #[must_use]
    pub fn state(&self) -> &OptimizerState<Id> {
        &self.state
    }

    /// Forgets all optimizer state.
    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// Runs one projected gradient step on a batch.
    ///
    /// An empty batch leaves the model and optimizer state unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::Model`] if a forward pass fails.
    /// - [`Error::TargetLength`] if a prediction and its target differ in length.
    /// - [`Error::Gradient`] if the provider fails.
    /// - [`Error::GradientShape`] or [`Error::UnknownGroup`] if the gradients
    ///   do not match the model's parameter groups.
    ///
    /// The model is not modified when an error is returned.
    pub fn train_step<M, L, G>(
        &mut self,
        model: &mut M,
        batch: &[Example],
        loss: &L,
        provider: &G,
    ) -> Result<StepReport, Error>
    where
        M: Model<Input = [f64], Output = Vec<f64>> + Parameterized<Id = Id> + Projectable,
        L: Loss + ?Sized,
        G: GradientProvider<M>,
    {
        if batch.is_empty() {
            return Ok(StepReport::skipped());
        }

        let batch_loss = batch_loss(model, batch, loss).map_err(Error::batch)?;
        let gradients = provider
            .gradients(model, batch, loss)
            .map_err(Error::gradient)?;

        let gradient_max = gradients.max_abs();
        let projection = self.apply(model, &gradients)?;

        Ok(StepReport {
            loss: batch_loss,
            gradient_max,
            projection,
        })
    }

    /// Runs one projected gradient step over several shards of a batch.
    ///
    /// Shard gradients are averaged, weighted by shard size, before a single
    /// update and a single projection. The result matches
    /// [`train_step`](Self::train_step) on the concatenated batch up to
    /// floating-point rounding.
    ///
    /// # Errors
    ///
    /// Same as [`train_step`](Self::train_step).
    pub fn train_step_sharded<M, L, G>(
        &mut self,
        model: &mut M,
        shards: &[&[Example]],
        loss: &L,
        provider: &G,
    ) -> Result<StepReport, Error>
    where
        M: Model<Input = [f64], Output = Vec<f64>> + Parameterized<Id = Id> + Projectable,
        L: Loss + ?Sized,
        G: GradientProvider<M>,
    {
        let total: usize = shards.iter().map(|shard| shard.len()).sum();
        if total == 0 {
            return Ok(StepReport::skipped());
        }

        let mut gradients = Gradients::new();
        let mut mean_loss = 0.0;
        for shard in shards.iter().filter(|shard| !shard.is_empty()) {
            #[allow(clippy::cast_precision_loss)]
            let weight = shard.len() as f64 / total as f64;

            mean_loss += weight * batch_loss(model, shard, loss).map_err(Error::batch)?;
            let shard_gradients = provider
                .gradients(model, shard, loss)
                .map_err(Error::gradient)?;
            gradients.accumulate(&shard_gradients, weight);
        }
        tracing::trace!(shards = shards.len(), examples = total, "accumulated shard gradients");

        let gradient_max = gradients.max_abs();
        let projection = self.apply(model, &gradients)?;

        Ok(StepReport {
            loss: mean_loss,
            gradient_max,
            projection,
        })
    }

    /// Applies precomputed gradients, then projects the model.
    ///
    /// Groups without a gradient are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownGroup`] or [`Error::GradientShape`] before
    /// touching any parameter if `gradients` does not match the model.
    pub fn apply<M>(&mut self, model: &mut M, gradients: &Gradients<Id>) -> Result<ProjectionReport, Error>
    where
        M: Parameterized<Id = Id> + Projectable,
    {
        for (id, gradient) in gradients.iter() {
            let Some(params) = model.params(id) else {
                return Err(Error::UnknownGroup {
                    group: format!("{id:?}"),
                });
            };
            if params.len() != gradient.len() {
                return Err(Error::GradientShape {
                    group: format!("{id:?}"),
                    expected: params.len(),
                    actual: gradient.len(),
                });
            }
        }

        for (id, gradient) in gradients.iter() {
            if let Some(params) = model.params_mut(id) {
                self.optimizer.update(self.state.entry(id), params, gradient);
            }
        }

        Ok(model.project())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{
        fixtures::{Analytic, BrokenProvider, Line, LineParam, MisshapenProvider},
        loss::SquaredError,
    };

    use super::*;

    fn data() -> Vec<Example> {
        vec![
            Example::scalar([0.0], 1.0),
            Example::scalar([1.0], 3.0),
            Example::scalar([2.0], 5.0),
        ]
    }

    #[test]
    fn step_descends_the_gradient() {
        let mut model = Line::new(0.0, 0.0);
        let mut trainer = Trainer::new(Optimizer::sgd(0.1).unwrap());

        let report = trainer
            .train_step(&mut model, &data(), &SquaredError, &Analytic)
            .unwrap();

        // Residuals are -1, -3, -5: d/da = 2 * mean(r * x) = -26/3, d/db = -6.
        assert_relative_eq!(report.loss, 35.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(report.gradient_max, 26.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(model.slope(), 2.6 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(model.intercept(), 0.6, epsilon = 1e-12);
        assert_eq!(trainer.state().len(), 2);
    }

    #[test]
    fn step_projects_after_updating() {
        // Data wants a negative slope; the model only allows slope >= 0.
        let batch = [Example::scalar([0.0], 1.0), Example::scalar([1.0], -1.0)];
        let mut model = Line::new(0.5, 0.0).with_min_slope(0.0);
        let mut trainer = Trainer::new(Optimizer::sgd(1.0).unwrap());

        let report = trainer
            .train_step(&mut model, &batch, &SquaredError, &Analytic)
            .unwrap();

        assert_eq!(model.slope(), 0.0);
        assert!(report.projection.converged);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut model = Line::new(1.0, 2.0);
        let mut trainer = Trainer::new(Optimizer::sgd(0.1).unwrap());

        let report = trainer
            .train_step(&mut model, &[], &SquaredError, &Analytic)
            .unwrap();

        assert_eq!(report, StepReport::skipped());
        assert_eq!(model, Line::new(1.0, 2.0));
        assert!(trainer.state().is_empty());
    }

    #[test]
    fn sharded_step_matches_full_batch() {
        let examples = data();
        let optimizer = Optimizer::momentum(0.05, 0.9).unwrap();

        let mut full = Line::new(0.3, -0.2);
        let mut full_trainer = Trainer::new(optimizer);
        let mut sharded = full.clone();
        let mut sharded_trainer = Trainer::new(optimizer);

        for _ in 0..3 {
            let a = full_trainer
                .train_step(&mut full, &examples, &SquaredError, &Analytic)
                .unwrap();
            let b = sharded_trainer
                .train_step_sharded(
                    &mut sharded,
                    &[&examples[..1], &examples[1..]],
                    &SquaredError,
                    &Analytic,
                )
                .unwrap();
            assert_relative_eq!(a.loss, b.loss, epsilon = 1e-12);
        }

        assert_relative_eq!(full.slope(), sharded.slope(), epsilon = 1e-12);
        assert_relative_eq!(full.intercept(), sharded.intercept(), epsilon = 1e-12);
    }

    #[test]
    fn provider_failure_leaves_model_untouched() {
        let mut model = Line::new(1.0, 1.0);
        let mut trainer = Trainer::new(Optimizer::sgd(0.1).unwrap());

        let err = trainer
            .train_step(&mut model, &data(), &SquaredError, &BrokenProvider)
            .unwrap_err();

        assert!(matches!(err, Error::Gradient(_)));
        assert_eq!(model, Line::new(1.0, 1.0));
    }

    #[test]
    fn target_length_mismatch_is_an_error() {
        let mut model = Line::new(1.0, 1.0);
        let mut trainer = Trainer::new(Optimizer::sgd(0.1).unwrap());
        let batch = [Example::scalar([0.0], 1.0), Example::new([1.0], [3.0, 3.0])];

        let err = trainer
            .train_step(&mut model, &batch, &SquaredError, &Analytic)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::TargetLength {
                index: 1,
                prediction: 1,
                target: 2,
            }
        ));
        assert_eq!(model, Line::new(1.0, 1.0));

        let err = trainer
            .train_step_sharded(&mut model, &[&batch[..1], &batch[1..]], &SquaredError, &Analytic)
            .unwrap_err();
        assert!(matches!(err, Error::TargetLength { .. }));
        assert_eq!(model, Line::new(1.0, 1.0));
    }

    #[test]
    fn misshapen_gradients_are_rejected_before_updating() {
        let mut model = Line::new(1.0, 1.0);
        let mut trainer = Trainer::new(Optimizer::sgd(0.1).unwrap());

        let err = trainer
            .train_step(&mut model, &data(), &SquaredError, &MisshapenProvider)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::GradientShape {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert_eq!(model, Line::new(1.0, 1.0));
        assert!(trainer.state().get(LineParam::Slope).is_none());
    }

    #[test]
    fn reset_clears_state() {
        let mut model = Line::new(0.0, 0.0);
        let mut trainer = Trainer::new(Optimizer::adam(0.01).unwrap());
        trainer
            .train_step(&mut model, &data(), &SquaredError, &Analytic)
            .unwrap();
        assert_eq!(trainer.state().get(LineParam::Intercept).map(|s| s.steps()), Some(1));

        trainer.reset();
        assert!(trainer.state().is_empty());
    }
}
