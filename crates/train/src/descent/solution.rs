/// Indicates whether training ran every epoch or was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ran every configured epoch.
    Complete,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of a training run.
///
/// The trained parameters live in the model passed to [`fit`](super::fit).
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final training status.
    pub status: Status,

    /// Number of epochs that ran to completion.
    pub epochs: usize,

    /// Number of steps taken, including those of an interrupted epoch.
    pub steps: usize,

    /// Mean pre-update loss of each completed epoch, weighted by batch size.
    pub epoch_losses: Vec<f64>,
}
