use std::hash::Hash;

/// A model whose learnable parameters are grouped into identified slices.
///
/// Each group is addressed by a stable identity (`Id`) that survives between
/// forward and backward calls, so gradient providers and optimizers can key
/// their own state by it. Identities are owned by the model; a group that is
/// not present (for example an optional output layer) returns `None`.
pub trait Parameterized {
    type Id: Copy + Eq + Hash + std::fmt::Debug;

    /// Returns the identities of every parameter group, in a stable order.
    fn param_ids(&self) -> Vec<Self::Id>;

    /// Returns the parameters of a group.
    fn params(&self, id: Self::Id) -> Option<&[f64]>;

    /// Returns the parameters of a group for in-place mutation.
    fn params_mut(&mut self, id: Self::Id) -> Option<&mut [f64]>;

    /// Returns the total number of learnable parameters.
    fn num_params(&self) -> usize {
        self.param_ids()
            .into_iter()
            .filter_map(|id| self.params(id).map(<[f64]>::len))
            .sum()
    }
}

/// A model whose parameters are subject to shape constraints.
///
/// Implementors restore feasibility in place, moving parameters to the
/// nearest point (in the L2 sense, up to the configured iteration budget)
/// that satisfies every declared constraint.
pub trait Projectable {
    /// Projects every constrained parameter group onto its feasible set.
    fn project(&mut self) -> ProjectionReport;
}

/// Summary of a projection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionReport {
    /// Largest number of iterations any single projection used.
    pub iterations: usize,

    /// Whether every projection met its convergence tolerance.
    pub converged: bool,

    /// Largest remaining constraint violation after projection.
    ///
    /// Zero whenever the result is exactly feasible.
    pub max_violation: f64,
}

impl ProjectionReport {
    /// A report for a pass that had nothing to do.
    #[must_use]
    pub fn trivial() -> Self {
        Self {
            iterations: 0,
            converged: true,
            max_violation: 0.0,
        }
    }

    /// Combines two reports, keeping the worst of each field.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            iterations: self.iterations.max(other.iterations),
            converged: self.converged && other.converged,
            max_violation: self.max_violation.max(other.max_violation),
        }
    }
}

impl Default for ProjectionReport {
    fn default() -> Self {
        Self::trivial()
    }
}
