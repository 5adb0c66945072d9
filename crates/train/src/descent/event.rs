use crate::trainer::StepReport;

/// Emitted by [`fit`](super::fit) after every training step.
///
/// The model has already been updated and projected when the event is
/// emitted.
#[derive(Debug)]
pub struct Event<'a, M> {
    /// Zero-based epoch index.
    pub epoch: usize,

    /// One-based step count across all epochs.
    pub step: usize,

    /// Number of examples in this step's batch.
    pub batch_size: usize,

    /// Loss, gradient, and projection summary of the step.
    pub report: StepReport,

    /// The model after the step.
    pub model: &'a M,
}

impl<M> Event<'_, M> {
    /// Returns the mean batch loss before the update.
    #[must_use]
    pub fn loss(&self) -> f64 {
        self.report.loss
    }
}
