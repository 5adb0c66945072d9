//! Constraint projection for calibrator outputs and lattice vertex values.
//!
//! After each optimizer step, parameters are moved back onto their feasible
//! set using the smallest (L2) perturbation available:
//!
//! - **Monotonicity** uses pool-adjacent-violators along every 1-D lane,
//!   which is the exact projection onto the monotone cone.
//! - **Bounds** clamp elementwise, the exact projection onto a box.
//! - **Convexity/concavity** are sparse half-space inequalities on
//!   neighbouring slopes.
//!
//! A single monotone set plus bounds is projected exactly in one pass
//! (isotonic regression followed by clamping). Anything with more interacting
//! sets (several monotone lattice axes, or curvature) runs Dykstra's
//! alternating projection, or plain cyclic projection, up to the configured
//! iteration budget. Either way the result is feasible on return:
//!
//! - With only monotone and box sets, a final sequential pass is exact, since
//!   isotonic regression is order-preserving and never breaks an earlier axis.
//! - With curvature, the iterate is pulled along a straight line toward a
//!   strictly feasible anchor until every inequality holds. All sets are
//!   linear, so the stopping point is computed exactly, and the move is no
//!   larger than the remaining violation requires.
//!
//! Projections that do not converge keep that feasible point and log a
//! warning; they are never fatal.

mod config;
mod isotonic;
mod sets;

pub use config::{ProjectionConfig, ProjectionStrategy};
pub use isotonic::{project_monotone, project_nondecreasing};

use trellis_core::ProjectionReport;

use crate::shape::{Bounds, ConstraintSpec, Curvature, Monotonicity};

pub(crate) use sets::for_each_lane;

use sets::Set;

/// Projects a 1-D sequence sampled at `xs` onto the constraints of `spec`.
///
/// `xs` must be strictly increasing and the same length as `values`; curvature
/// is measured on slopes between neighbouring `xs`.
pub fn project_sequence(
    xs: &[f64],
    values: &mut [f64],
    spec: &ConstraintSpec,
    config: &ProjectionConfig,
) -> ProjectionReport {
    debug_assert_eq!(xs.len(), values.len());

    let mut sets = Vec::new();
    if let Some(direction) = spec.monotonicity() {
        sets.push(Set::Monotone { axis: 0, direction });
    }
    if let Some(curvature) = spec.curvature() {
        sets.extend(sets::sequence_curvature(xs, curvature));
    }
    if let Some(bounds) = spec.bounds() {
        sets.push(Set::Box(bounds));
    }

    let profiles: Vec<Profile> = match (xs.first(), xs.last()) {
        (Some(&first), Some(&last)) if last > first => {
            Profile::new(0, xs.iter().map(|x| (x - first) / (last - first)), spec)
                .into_iter()
                .collect()
        }
        _ => Vec::new(),
    };

    project_onto(values, &[values.len()], &sets, &profiles, config)
}

/// Projects a row-major grid of values onto per-axis shape constraints.
///
/// `shape` may have trailing axes beyond `axes.len()` (such as an output-unit
/// axis); those are left unconstrained. Bounds inside `axes` are ignored;
/// value bounds apply to every element through `bounds`.
pub fn project_grid(
    values: &mut [f64],
    shape: &[usize],
    axes: &[ConstraintSpec],
    bounds: Option<Bounds>,
    config: &ProjectionConfig,
) -> ProjectionReport {
    debug_assert_eq!(values.len(), shape.iter().product::<usize>());
    debug_assert!(axes.len() <= shape.len());

    let mut sets = Vec::new();
    for (axis, spec) in axes.iter().enumerate() {
        if let Some(direction) = spec.monotonicity() {
            sets.push(Set::Monotone { axis, direction });
        }
    }
    for (axis, spec) in axes.iter().enumerate() {
        if let Some(curvature) = spec.curvature() {
            sets.extend(sets::grid_curvature(shape, axis, curvature));
        }
    }
    if let Some(bounds) = bounds {
        sets.push(Set::Box(bounds));
    }

    #[allow(clippy::cast_precision_loss)]
    let profiles: Vec<Profile> = axes
        .iter()
        .enumerate()
        .filter_map(|(axis, spec)| {
            let top = (shape[axis] - 1) as f64;
            Profile::new(axis, (0..shape[axis]).map(|j| j as f64 / top), spec)
        })
        .collect();

    project_onto(values, shape, &sets, &profiles, config)
}

/// The shape of a strictly feasible anchor along one axis.
///
/// Built from normalized positions `t` in `[0, 1]` as `m * t + c * t^2 / 4`,
/// where `m` and `c` are the monotonicity and curvature signs. The slope
/// `m + c * t / 2` never changes sign, so the profile is strictly monotone
/// and strictly convex or concave as declared.
struct Profile {
    axis: usize,
    heights: Vec<f64>,
}

impl Profile {
    fn new(
        axis: usize,
        positions: impl Iterator<Item = f64>,
        spec: &ConstraintSpec,
    ) -> Option<Self> {
        let slope = spec.monotonicity().map_or(0.0, Monotonicity::sign);
        let bend = spec.curvature().map_or(0.0, Curvature::sign);
        if slope == 0.0 && bend == 0.0 {
            return None;
        }
        let heights = positions.map(|t| slope * t + bend * t * t / 4.0).collect();
        Some(Self { axis, heights })
    }
}

/// Returns the largest violation of any set, zero when feasible.
fn max_violation(values: &[f64], shape: &[usize], sets: &[Set]) -> f64 {
    sets.iter()
        .fold(0.0, |worst, set| worst.max(set.violation(values, shape)))
}

/// Dykstra correction term for one set.
enum Correction {
    /// Halfspace corrections are always a multiple of the normal.
    Scalar(f64),
    Full(Vec<f64>),
}

fn project_onto(
    values: &mut [f64],
    shape: &[usize],
    sets: &[Set],
    profiles: &[Profile],
    config: &ProjectionConfig,
) -> ProjectionReport {
    if sets.is_empty() {
        return ProjectionReport::trivial();
    }

    let has_halfspaces = sets.iter().any(Set::is_halfspace);
    let monotone_count = sets
        .iter()
        .filter(|set| matches!(set, Set::Monotone { .. }))
        .count();

    let mut scratch = Vec::new();

    if !has_halfspaces && monotone_count <= 1 {
        feasibility_pass(values, shape, sets, &mut scratch);
        return ProjectionReport {
            iterations: 1,
            converged: true,
            max_violation: max_violation(values, shape, sets),
        };
    }

    let (iterations, converged) = alternate(values, shape, sets, config, &mut scratch);

    if !has_halfspaces {
        feasibility_pass(values, shape, sets, &mut scratch);
    } else if max_violation(values, shape, sets) > 0.0 {
        pull_into(values, shape, sets, profiles);
    }

    let max_violation = max_violation(values, shape, sets);
    if !converged {
        tracing::warn!(
            iterations,
            max_violation,
            "constraint projection did not converge within the iteration budget"
        );
    }

    ProjectionReport {
        iterations,
        converged,
        max_violation,
    }
}

/// Projects onto each non-box set in order, then onto the box sets.
fn feasibility_pass(values: &mut [f64], shape: &[usize], sets: &[Set], scratch: &mut Vec<f64>) {
    for set in sets.iter().filter(|set| !matches!(set, Set::Box(_))) {
        set.project(values, shape, scratch);
    }
    for set in sets.iter().filter(|set| matches!(set, Set::Box(_))) {
        set.project(values, shape, scratch);
    }
}

/// Moves `values` toward a strictly feasible anchor, stopping at the first
/// point of the segment that lies in every set.
fn pull_into(values: &mut [f64], shape: &[usize], sets: &[Set], profiles: &[Profile]) {
    let bounds = sets.iter().find_map(|set| match set {
        Set::Box(bounds) => Some(*bounds),
        _ => None,
    });
    let anchor = anchor(values, shape, profiles, bounds);

    let theta = sets
        .iter()
        .fold(1.0_f64, |theta, set| theta.min(set.reach(&anchor, values, shape)));
    for (v, a) in values.iter_mut().zip(&anchor) {
        *v = a + theta * (*v - a);
    }
}

/// Builds a point strictly inside every set, centered on `values`.
///
/// The anchor is a constant plus a scaled sum of the axis profiles. Its
/// amplitude follows the spread of `values`, shrunk so that it fits well
/// inside `bounds`. Degenerate bounds (`lower == upper`) collapse the anchor
/// to that single feasible value.
#[allow(clippy::cast_precision_loss)]
fn anchor(values: &[f64], shape: &[usize], profiles: &[Profile], bounds: Option<Bounds>) -> Vec<f64> {
    let mut anchor = vec![0.0; values.len()];
    for profile in profiles {
        for_each_lane(shape, profile.axis, |start, stride, len| {
            for (j, height) in profile.heights.iter().enumerate().take(len) {
                anchor[start + j * stride] += height;
            }
        });
    }
    let reach = anchor.iter().fold(0.0_f64, |worst, a| worst.max(a.abs()));

    let (low, high) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let mut scale = if high > low { high - low } else { 1.0 };
    let mut center = values.iter().sum::<f64>() / values.len() as f64;

    if let Some(bounds) = bounds {
        if reach > 0.0 {
            scale = scale.min((bounds.upper() - bounds.lower()) / (4.0 * reach));
        }
        let margin = 2.0 * scale * reach;
        center = center.max(bounds.lower() + margin).min(bounds.upper() - margin);
    }

    for a in &mut anchor {
        *a = center + scale * *a;
    }
    anchor
}

/// Runs alternating projection sweeps; returns `(iterations, converged)`.
fn alternate(
    values: &mut [f64],
    shape: &[usize],
    sets: &[Set],
    config: &ProjectionConfig,
    scratch: &mut Vec<f64>,
) -> (usize, bool) {
    let dykstra = config.strategy() == ProjectionStrategy::Dykstra;

    let mut corrections: Vec<Correction> = sets
        .iter()
        .map(|set| match set {
            Set::Halfspace(_) => Correction::Scalar(0.0),
            Set::Monotone { .. } | Set::Box(_) => Correction::Full(vec![0.0; values.len()]),
        })
        .collect();

    let mut previous = values.to_vec();

    for iter in 1..=config.max_iterations() {
        previous.copy_from_slice(values);

        for (set, correction) in sets.iter().zip(corrections.iter_mut()) {
            if !dykstra {
                set.project(values, shape, scratch);
                continue;
            }
            match (set, correction) {
                (Set::Halfspace(halfspace), Correction::Scalar(lambda)) => {
                    halfspace.project_corrected(values, lambda);
                }
                (_, Correction::Full(p)) => {
                    // y = x + p; x' = P(y); p' = y - x'
                    for (v, c) in values.iter_mut().zip(p.iter()) {
                        *v += c;
                    }
                    p.copy_from_slice(values);
                    set.project(values, shape, scratch);
                    for (c, v) in p.iter_mut().zip(values.iter()) {
                        *c -= v;
                    }
                }
                (_, Correction::Scalar(_)) => set.project(values, shape, scratch),
            }
        }

        let change = values
            .iter()
            .zip(&previous)
            .fold(0.0_f64, |worst, (v, p)| worst.max((v - p).abs()));

        if change <= config.tolerance() {
            return (iter, true);
        }
    }

    (config.max_iterations(), false)
}
