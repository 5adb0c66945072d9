/// Actions an observer can take during [`fit`](super::fit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop training after the current step.
    ///
    /// The step has already been applied and projected, so the model is
    /// feasible when training returns.
    StopEarly,
}
