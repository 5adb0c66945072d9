use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error};

/// How multiple constraint sets are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionStrategy {
    /// Dykstra's alternating projection: keeps a correction per set so the
    /// iterates converge to the nearest point of the intersection.
    #[default]
    Dykstra,

    /// Plain cyclic projection: converges to a feasible point, not
    /// necessarily the nearest one.
    Cyclic,
}

/// Configuration for iterative constraint projection.
///
/// Only used when a parameter group has more than one interacting constraint
/// set (for example a lattice monotonic along several axes, or a convex
/// calibrator). Single-set projections are exact and ignore these limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRecord", into = "ConfigRecord")]
pub struct ProjectionConfig {
    max_iterations: usize,
    tolerance: f64,
    strategy: ProjectionStrategy,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-9,
            strategy: ProjectionStrategy::Dykstra,
        }
    }
}

impl ProjectionConfig {
    /// Creates a new config with a validated iteration cap and tolerance.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Iterations`] if `max_iterations` is zero.
    /// - [`ConfigError::Tolerance`] if `tolerance` is negative or non-finite.
    pub fn new(
        max_iterations: usize,
        tolerance: f64,
        strategy: ProjectionStrategy,
    ) -> Result<Self, Error> {
        if max_iterations == 0 {
            return Err(ConfigError::Iterations.into());
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Tolerance.into());
        }

        Ok(Self {
            max_iterations,
            tolerance,
            strategy,
        })
    }

    /// Returns the maximum number of sweeps over all constraint sets.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the convergence tolerance on the largest per-sweep change.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns how interacting constraint sets are combined.
    #[must_use]
    pub fn strategy(&self) -> ProjectionStrategy {
        self.strategy
    }
}

#[derive(Serialize, Deserialize)]
struct ConfigRecord {
    max_iterations: usize,
    tolerance: f64,
    #[serde(default)]
    strategy: ProjectionStrategy,
}

impl From<ProjectionConfig> for ConfigRecord {
    fn from(config: ProjectionConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            strategy: config.strategy,
        }
    }
}

impl TryFrom<ConfigRecord> for ProjectionConfig {
    type Error = Error;

    fn try_from(record: ConfigRecord) -> Result<Self, Self::Error> {
        Self::new(record.max_iterations, record.tolerance, record.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ProjectionConfig::default();
        let rebuilt =
            ProjectionConfig::new(config.max_iterations(), config.tolerance(), config.strategy())
                .unwrap();
        assert_eq!(config, rebuilt);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            ProjectionConfig::new(0, 1e-9, ProjectionStrategy::Dykstra).unwrap_err(),
            Error::Config(ConfigError::Iterations)
        );
        assert_eq!(
            ProjectionConfig::new(10, -1.0, ProjectionStrategy::Cyclic).unwrap_err(),
            Error::Config(ConfigError::Tolerance)
        );
        assert_eq!(
            ProjectionConfig::new(10, f64::NAN, ProjectionStrategy::Cyclic).unwrap_err(),
            Error::Config(ConfigError::Tolerance)
        );
    }
}
