/// A callable model that maps a typed input to a typed output.
///
/// Models must be deterministic, always producing the same result for a given
/// input and parameter state, which makes them a stable foundation for
/// trainers, gradient providers, and instrumentation.
///
/// `Input` may be unsized so that models can be called on borrowed slices
/// such as `[f64]` without allocating.
pub trait Model {
    type Input: ?Sized;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Calls the model with the given input.
    ///
    /// # Errors
    ///
    /// Each model defines its own `Error` type to represent domain-specific failures.
    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}
