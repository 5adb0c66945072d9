/// A hook called by a training loop after every step.
///
/// The loop hands each observer an event describing the step just taken (its
/// loss, position in the run, and the freshly projected model). Returning
/// `Some(action)` asks the loop to change course, for example to stop early;
/// `None` means carry on. What actions exist is up to each loop, which is why
/// the action type is a parameter here.
///
/// Any `FnMut(&E) -> Option<A>` closure is an observer, so one-off policies
/// need no type of their own. `()` is the observer that never intervenes.
pub trait Observer<E, A> {
    /// Inspects one step and optionally requests an action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
