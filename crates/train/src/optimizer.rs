//! First-order optimizers with explicit per-group state.
//!
//! An [`Optimizer`] is a stateless update rule. Anything it remembers between
//! steps (momentum buffers, Adam moments, step counts) lives in an
//! [`OptimizerState`] keyed by parameter-group identity and owned by the
//! [`Trainer`](crate::Trainer).

use std::{collections::HashMap, hash::Hash};

use crate::error::ConfigError;

/// A gradient-descent update rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimizer {
    /// Plain stochastic gradient descent: `p -= lr * g`.
    Sgd { learning_rate: f64 },

    /// Heavy-ball momentum: `v = mu * v + g`, `p -= lr * v`.
    Momentum { learning_rate: f64, momentum: f64 },

    /// Adam with bias-corrected first and second moments.
    Adam {
        learning_rate: f64,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    },
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::Adam {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl Optimizer {
    /// Creates a plain SGD optimizer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LearningRate`] if `learning_rate` is not finite
    /// and positive.
    pub fn sgd(learning_rate: f64) -> Result<Self, ConfigError> {
        Self::Sgd { learning_rate }.validated()
    }

    /// Creates a momentum optimizer.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::LearningRate`] if `learning_rate` is not finite and positive.
    /// - [`ConfigError::Momentum`] if `momentum` is outside `[0, 1)`.
    pub fn momentum(learning_rate: f64, momentum: f64) -> Result<Self, ConfigError> {
        Self::Momentum {
            learning_rate,
            momentum,
        }
        .validated()
    }

    /// Creates an Adam optimizer with the usual `0.9`, `0.999`, `1e-8` defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LearningRate`] if `learning_rate` is not finite
    /// and positive.
    pub fn adam(learning_rate: f64) -> Result<Self, ConfigError> {
        Self::adam_with(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// Creates an Adam optimizer with explicit moment decay rates.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::LearningRate`] if `learning_rate` is not finite and positive.
    /// - [`ConfigError::Beta`] if either decay rate is outside `[0, 1)`.
    /// - [`ConfigError::Epsilon`] if `epsilon` is not finite and positive.
    pub fn adam_with(
        learning_rate: f64,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    ) -> Result<Self, ConfigError> {
        Self::Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        }
        .validated()
    }

    /// Checks every hyperparameter of an optimizer built from its variants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let unit = |x: f64| (0.0..1.0).contains(&x);
        let positive = |x: f64| x.is_finite() && x > 0.0;

        if !positive(self.learning_rate()) {
            return Err(ConfigError::LearningRate);
        }
        match self {
            Self::Sgd { .. } => {}
            Self::Momentum { momentum, .. } => {
                if !unit(momentum) {
                    return Err(ConfigError::Momentum);
                }
            }
            Self::Adam {
                beta1,
                beta2,
                epsilon,
                ..
            } => {
                if !unit(beta1) || !unit(beta2) {
                    return Err(ConfigError::Beta);
                }
                if !positive(epsilon) {
                    return Err(ConfigError::Epsilon);
                }
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        match *self {
            Self::Sgd { learning_rate }
            | Self::Momentum { learning_rate, .. }
            | Self::Adam { learning_rate, .. } => learning_rate,
        }
    }

    /// Applies one update to `params` in place.
    ///
    /// `params` and `gradient` must have equal lengths; the caller checks.
    pub(crate) fn update(&self, state: &mut ParamState, params: &mut [f64], gradient: &[f64]) {
        state.resize(params.len());
        state.steps += 1;

        match *self {
            Self::Sgd { learning_rate } => {
                for (p, g) in params.iter_mut().zip(gradient) {
                    *p -= learning_rate * g;
                }
            }
            Self::Momentum {
                learning_rate,
                momentum,
            } => {
                for ((p, g), v) in params.iter_mut().zip(gradient).zip(&mut state.first) {
                    *v = momentum * *v + g;
                    *p -= learning_rate * *v;
                }
            }
            Self::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let t = i32::try_from(state.steps).unwrap_or(i32::MAX);
                let correction1 = 1.0 - beta1.powi(t);
                let correction2 = 1.0 - beta2.powi(t);

                let moments = state.first.iter_mut().zip(&mut state.second);
                for ((p, g), (m, v)) in params.iter_mut().zip(gradient).zip(moments) {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
                }
            }
        }
    }
}

/// Optimizer memory for one parameter group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamState {
    first: Vec<f64>,
    second: Vec<f64>,
    steps: u64,
}

impl ParamState {
    /// Returns the number of updates applied to this group.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Returns the momentum buffer (or Adam first moment).
    #[must_use]
    pub fn first_moment(&self) -> &[f64] {
        &self.first
    }

    /// Returns the Adam second moment; empty for other optimizers' use.
    #[must_use]
    pub fn second_moment(&self) -> &[f64] {
        &self.second
    }

    /// Sizes the buffers for a group of `len` parameters.
    ///
    /// A group whose size changed starts over from zeroed buffers.
    fn resize(&mut self, len: usize) {
        if self.first.len() != len {
            *self = Self {
                first: vec![0.0; len],
                second: vec![0.0; len],
                steps: 0,
            };
        }
    }
}

/// Optimizer memory for every parameter group, keyed by group identity.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerState<Id: Eq + Hash> {
    groups: HashMap<Id, ParamState>,
}

impl<Id: Eq + Hash> Default for OptimizerState<Id> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }
}

impl<Id: Copy + Eq + Hash> OptimizerState<Id> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of one group, if it has been updated.
    #[must_use]
    pub fn get(&self, id: Id) -> Option<&ParamState> {
        self.groups.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Forgets every group's state.
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub(crate) fn entry(&mut self, id: Id) -> &mut ParamState {
        self.groups.entry(id).or_default()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn step(optimizer: Optimizer, state: &mut ParamState, param: f64, gradient: f64) -> f64 {
        let mut params = [param];
        optimizer.update(state, &mut params, &[gradient]);
        params[0]
    }

    #[test]
    fn sgd_steps_against_gradient() {
        let sgd = Optimizer::sgd(0.1).unwrap();
        let mut state = ParamState::default();
        assert_relative_eq!(step(sgd, &mut state, 1.0, 2.0), 0.8);
        assert_eq!(state.steps(), 1);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let optimizer = Optimizer::momentum(0.1, 0.9).unwrap();
        let mut state = ParamState::default();

        let p = step(optimizer, &mut state, 1.0, 2.0);
        assert_relative_eq!(p, 0.8);

        // v = 0.9 * 2 + 2 = 3.8
        let p = step(optimizer, &mut state, p, 2.0);
        assert_relative_eq!(p, 0.42, epsilon = 1e-12);
        assert_relative_eq!(state.first_moment()[0], 3.8, epsilon = 1e-12);
    }

    #[test]
    fn adam_first_step_is_learning_rate_sized() {
        let adam = Optimizer::adam(0.1).unwrap();
        let mut state = ParamState::default();

        assert_relative_eq!(step(adam, &mut state, 1.0, 2.0), 0.9, epsilon = 1e-8);

        // A large opposing gradient moves by at most about one learning rate.
        let p = step(adam, &mut state, 0.0, -50.0);
        assert!(p > 0.0 && p <= 0.1);
        assert_eq!(state.steps(), 2);
    }

    #[test]
    fn resized_group_restarts_state() {
        let optimizer = Optimizer::momentum(0.1, 0.5).unwrap();
        let mut state = ParamState::default();
        step(optimizer, &mut state, 1.0, 1.0);

        let mut params = [0.0, 0.0];
        optimizer.update(&mut state, &mut params, &[1.0, -1.0]);

        assert_eq!(state.steps(), 1);
        assert_eq!(state.first_moment(), &[1.0, -1.0]);
    }

    #[test]
    fn invalid_hyperparameters_are_rejected() {
        assert_eq!(Optimizer::sgd(0.0), Err(ConfigError::LearningRate));
        assert_eq!(Optimizer::sgd(f64::NAN), Err(ConfigError::LearningRate));
        assert_eq!(Optimizer::momentum(0.1, 1.0), Err(ConfigError::Momentum));
        assert_eq!(
            Optimizer::adam_with(0.1, 0.9, -0.1, 1e-8),
            Err(ConfigError::Beta)
        );
        assert_eq!(Optimizer::adam_with(0.1, 0.9, 0.99, 0.0), Err(ConfigError::Epsilon));
        assert!(Optimizer::default().validated().is_ok());
    }

    #[test]
    fn state_map_is_keyed_by_identity() {
        let optimizer = Optimizer::sgd(1.0).unwrap();
        let mut state = OptimizerState::new();

        optimizer.update(state.entry('a'), &mut [0.0], &[1.0]);
        optimizer.update(state.entry('a'), &mut [0.0], &[1.0]);
        optimizer.update(state.entry('b'), &mut [0.0, 0.0], &[1.0, 1.0]);

        assert_eq!(state.len(), 2);
        assert_eq!(state.get('a').map(ParamState::steps), Some(2));
        assert_eq!(state.get('b').map(ParamState::steps), Some(1));
        assert!(state.get('c').is_none());

        state.clear();
        assert!(state.is_empty());
    }
}
