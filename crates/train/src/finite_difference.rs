use trellis_core::{
    BatchError, Example, GradientProvider, Gradients, Loss, Model, Parameterized, batch_loss,
};

use crate::error::ConfigError;

/// Gradient provider using central finite differences.
///
/// Each parameter is nudged by `±step` on a private copy of the model and the
/// mean batch loss is re-evaluated, so a batch costs `2 * num_params` passes.
/// Meant for tests and small models; piecewise-linear models are not
/// differentiable at keypoints, where the estimate averages the one-sided
/// slopes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteDifference {
    step: f64,
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self { step: 1e-6 }
    }
}

impl FiniteDifference {
    /// Creates a provider with the given perturbation size.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Step`] if `step` is not finite and positive.
    pub fn new(step: f64) -> Result<Self, ConfigError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::Step);
        }
        Ok(Self { step })
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }
}

impl<M> GradientProvider<M> for FiniteDifference
where
    M: Model<Input = [f64], Output = Vec<f64>> + Parameterized + Clone,
{
    type Error = BatchError<M::Error>;

    fn gradients<L: Loss + ?Sized>(
        &self,
        model: &M,
        batch: &[Example],
        loss: &L,
    ) -> Result<Gradients<M::Id>, Self::Error> {
        let mut perturbed = model.clone();
        let mut gradients = Gradients::new();

        for id in model.param_ids() {
            let Some(params) = model.params(id) else {
                continue;
            };

            let mut gradient = Vec::with_capacity(params.len());
            for (i, &original) in params.iter().enumerate() {
                set(&mut perturbed, id, i, original + self.step);
                let above = batch_loss(&perturbed, batch, loss)?;
                set(&mut perturbed, id, i, original - self.step);
                let below = batch_loss(&perturbed, batch, loss)?;
                set(&mut perturbed, id, i, original);

                gradient.push((above - below) / (2.0 * self.step));
            }
            gradients.insert(id, gradient);
        }

        Ok(gradients)
    }
}

fn set<M: Parameterized>(model: &mut M, id: M::Id, index: usize, value: f64) {
    if let Some(param) = model.params_mut(id).and_then(|p| p.get_mut(index)) {
        *param = value;
    }
}
