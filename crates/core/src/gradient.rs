use std::{collections::HashMap, hash::Hash};

use thiserror::Error;

use crate::{Model, Parameterized};

/// A labeled training example.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Raw feature values, one per input dimension.
    pub features: Vec<f64>,

    /// Target values, one per model output unit.
    pub target: Vec<f64>,
}

impl Example {
    /// Creates an example from features and a target vector.
    pub fn new(features: impl Into<Vec<f64>>, target: impl Into<Vec<f64>>) -> Self {
        Self {
            features: features.into(),
            target: target.into(),
        }
    }

    /// Creates an example with a single target value.
    pub fn scalar(features: impl Into<Vec<f64>>, target: f64) -> Self {
        Self::new(features, vec![target])
    }
}

/// Scores a single prediction against its target.
///
/// Lower is better. Batch losses are the mean over examples
/// (see [`batch_loss`]).
pub trait Loss {
    /// Returns the loss for one prediction.
    ///
    /// `prediction` and `target` are expected to have the same length;
    /// [`batch_loss`] checks this before calling.
    fn loss(&self, prediction: &[f64], target: &[f64]) -> f64;
}

/// Errors from scoring a model on a batch.
#[derive(Debug, Error)]
pub enum BatchError<E> {
    /// The model failed on an example.
    #[error(transparent)]
    Model(E),

    /// A prediction and its target differ in length.
    #[error("example {index}: prediction has {prediction} values, target has {target}")]
    TargetLength {
        index: usize,
        prediction: usize,
        target: usize,
    },
}

/// Computes the mean loss of a model over a batch.
///
/// An empty batch has zero loss.
///
/// # Errors
///
/// - [`BatchError::Model`] if any forward call fails.
/// - [`BatchError::TargetLength`] if a prediction and its target differ in
///   length.
pub fn batch_loss<M, L>(
    model: &M,
    batch: &[Example],
    loss: &L,
) -> Result<f64, BatchError<M::Error>>
where
    M: Model<Input = [f64], Output = Vec<f64>> + ?Sized,
    L: Loss + ?Sized,
{
    if batch.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for (index, example) in batch.iter().enumerate() {
        let prediction = model
            .call(example.features.as_slice())
            .map_err(BatchError::Model)?;
        if prediction.len() != example.target.len() {
            return Err(BatchError::TargetLength {
                index,
                prediction: prediction.len(),
                target: example.target.len(),
            });
        }
        total += loss.loss(&prediction, &example.target);
    }

    #[allow(clippy::cast_precision_loss)]
    let count = batch.len() as f64;
    Ok(total / count)
}

/// Computes gradients of a batch loss with respect to a model's parameters.
///
/// This is the seam for the external gradient-computation collaborator. The
/// returned [`Gradients`] are keyed by the same identities the model reports
/// through [`Parameterized::param_ids`], and each gradient slice has the same
/// length as the corresponding parameter slice.
pub trait GradientProvider<M: Parameterized + ?Sized> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the gradient of the mean batch loss.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the gradient cannot be computed.
    fn gradients<L: Loss + ?Sized>(
        &self,
        model: &M,
        batch: &[Example],
        loss: &L,
    ) -> Result<Gradients<M::Id>, Self::Error>;
}

/// Gradients keyed by parameter-group identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients<Id: Eq + Hash> {
    groups: HashMap<Id, Vec<f64>>,
}

impl<Id: Eq + Hash> Default for Gradients<Id> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }
}

impl<Id: Copy + Eq + Hash> Gradients<Id> {
    /// Creates an empty gradient set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gradient for a parameter group, replacing any previous value.
    pub fn insert(&mut self, id: Id, gradient: Vec<f64>) {
        self.groups.insert(id, gradient);
    }

    /// Returns the gradient for a parameter group.
    #[must_use]
    pub fn get(&self, id: Id) -> Option<&[f64]> {
        self.groups.get(&id).map(Vec::as_slice)
    }

    /// Iterates over `(id, gradient)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &[f64])> {
        self.groups.iter().map(|(id, g)| (*id, g.as_slice()))
    }

    /// Returns the number of parameter groups with a gradient.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if no group has a gradient.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Adds `weight * other` into this gradient set.
    ///
    /// Groups missing from `self` are inserted. Used to combine per-shard
    /// gradients before a single optimizer update.
    pub fn accumulate(&mut self, other: &Self, weight: f64) {
        for (id, theirs) in &other.groups {
            let ours = self.groups.entry(*id).or_default();
            if ours.len() < theirs.len() {
                ours.resize(theirs.len(), 0.0);
            }
            for (o, t) in ours.iter_mut().zip(theirs) {
                *o += weight * t;
            }
        }
    }

    /// Multiplies every gradient entry by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for g in self.groups.values_mut().flat_map(|g| g.iter_mut()) {
            *g *= factor;
        }
    }

    /// Returns the largest absolute gradient entry, or zero if empty.
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.groups
            .values()
            .flat_map(|g| g.iter())
            .fold(0.0, |acc, g| acc.max(g.abs()))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn accumulate_inserts_and_adds_weighted() {
        let mut total = Gradients::new();
        total.insert('a', vec![1.0, 2.0]);

        let mut shard = Gradients::new();
        shard.insert('a', vec![2.0, 2.0]);
        shard.insert('b', vec![4.0]);

        total.accumulate(&shard, 0.5);

        assert_eq!(total.get('a'), Some(&[2.0, 3.0][..]));
        assert_eq!(total.get('b'), Some(&[2.0][..]));
        assert_eq!(total.len(), 2);
    }

    #[test]
    fn scale_and_max_abs() {
        let mut grads = Gradients::new();
        grads.insert(0_u8, vec![1.0, -3.0]);
        grads.insert(1_u8, vec![0.5]);

        grads.scale(-2.0);

        assert_eq!(grads.get(0), Some(&[-2.0, 6.0][..]));
        assert_relative_eq!(grads.max_abs(), 6.0);
        assert_relative_eq!(Gradients::<u8>::new().max_abs(), 0.0);
    }

    /// Doubles its single input.
    struct Doubler;

    impl Model for Doubler {
        type Input = [f64];
        type Output = Vec<f64>;
        type Error = Infallible;

        fn call(&self, input: &[f64]) -> Result<Vec<f64>, Self::Error> {
            Ok(vec![2.0 * input[0]])
        }
    }

    struct Absolute;

    impl Loss for Absolute {
        fn loss(&self, prediction: &[f64], target: &[f64]) -> f64 {
            (prediction[0] - target[0]).abs()
        }
    }

    #[test]
    fn batch_loss_is_mean_over_examples() {
        let batch = [Example::scalar([1.0], 2.0), Example::scalar([2.0], 0.0)];

        let loss = batch_loss(&Doubler, &batch, &Absolute).unwrap();

        // Errors are 0 and 4.
        assert_relative_eq!(loss, 2.0);
        assert_relative_eq!(batch_loss(&Doubler, &[], &Absolute).unwrap(), 0.0);
    }

    #[test]
    fn batch_loss_rejects_targets_of_the_wrong_length() {
        let batch = [
            Example::scalar([1.0], 2.0),
            Example::new([1.0], [2.0, 100.0]),
        ];

        let err = batch_loss(&Doubler, &batch, &Absolute).unwrap_err();

        assert!(matches!(
            err,
            BatchError::TargetLength {
                index: 1,
                prediction: 1,
                target: 2,
            }
        ));
    }
}
