use trellis_core::Observer;

use crate::traits::{HasLoss, HasProgress};

/// Emits an `info`-level `tracing` event every `every` steps.
///
/// Never returns an action. Install a subscriber to see the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogObserver {
    every: usize,
}

impl Default for LogObserver {
    fn default() -> Self {
        Self { every: 1 }
    }
}

impl LogObserver {
    /// Logs every step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every `every` steps; zero is treated as one.
    #[must_use]
    pub fn every(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }

    /// Returns whether the given step is logged.
    #[must_use]
    pub fn logs(&self, step: usize) -> bool {
        step % self.every == 0
    }
}

impl<E: HasLoss + HasProgress, A> Observer<E, A> for LogObserver {
    fn observe(&mut self, event: &E) -> Option<A> {
        if self.logs(event.step()) {
            tracing::info!(
                epoch = event.epoch(),
                step = event.step(),
                loss = event.loss(),
                "training progress"
            );
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tick(usize);

    impl HasLoss for Tick {
        fn loss(&self) -> f64 {
            1.0
        }
    }

    impl HasProgress for Tick {
        fn epoch(&self) -> usize {
            0
        }

        fn step(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn never_acts() {
        let mut observer = LogObserver::new();
        for step in 1..=5 {
            let action: Option<()> = observer.observe(&Tick(step));
            assert!(action.is_none());
        }
    }

    #[test]
    fn logs_on_multiples_of_every() {
        let observer = LogObserver::every(3);
        let logged: Vec<_> = (1..=9).filter(|&s| observer.logs(s)).collect();
        assert_eq!(logged, vec![3, 6, 9]);
        assert!(LogObserver::every(0).logs(7));
    }
}
