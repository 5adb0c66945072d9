use trellis_core::Observer;

use crate::traits::{HasLoss, HasProgress};

/// Records the loss of every step for later reporting.
///
/// Pass `&mut LossHistory` as the observer so the record can be read after
/// training. Never returns an action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    steps: Vec<(usize, f64)>,
}

impl LossHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `(step, loss)` point.
    pub fn record(&mut self, step: usize, loss: f64) {
        self.steps.push((step, loss));
    }

    /// Returns the recorded `(step, loss)` points in order.
    #[must_use]
    pub fn steps(&self) -> &[(usize, f64)] {
        &self.steps
    }

    /// Returns the lowest recorded loss, ignoring NaN.
    #[must_use]
    pub fn best(&self) -> Option<(usize, f64)> {
        self.steps
            .iter()
            .copied()
            .filter(|(_, loss)| !loss.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<E: HasLoss + HasProgress, A> Observer<E, A> for &mut LossHistory {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.record(event.step(), event.loss());
        None
    }
}
