use crate::shape::{Bounds, Curvature, Monotonicity};

use super::isotonic::project_monotone;

/// A closed convex set of parameter arrays with a cheap exact projection.
///
/// Parameters are a flat row-major slice interpreted with an n-d shape.
#[derive(Debug, Clone)]
pub(crate) enum Set {
    /// Monotone along every lane parallel to `axis`.
    Monotone {
        axis: usize,
        direction: Monotonicity,
    },

    /// A single linear inequality `a·y <= 0`.
    Halfspace(Halfspace),

    /// Every value inside `bounds`.
    Box(Bounds),
}

/// A sparse linear inequality `a·y <= 0`.
#[derive(Debug, Clone)]
pub(crate) struct Halfspace {
    terms: Vec<(usize, f64)>,
    norm_sq: f64,
}

impl Halfspace {
    fn new(terms: Vec<(usize, f64)>) -> Self {
        let norm_sq = terms.iter().map(|(_, a)| a * a).sum();
        Self { terms, norm_sq }
    }

    fn dot(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, a)| a * values[i]).sum()
    }

    /// Adds `amount * a` to `values`.
    fn shift(&self, values: &mut [f64], amount: f64) {
        for &(i, a) in &self.terms {
            values[i] += amount * a;
        }
    }

    /// Dykstra step with a scalar correction `lambda` (the correction vector is `lambda * a`).
    pub(crate) fn project_corrected(&self, values: &mut [f64], lambda: &mut f64) {
        let corrected_dot = self.dot(values) + *lambda * self.norm_sq;
        let t = (corrected_dot / self.norm_sq).max(0.0);
        self.shift(values, *lambda - t);
        *lambda = t;
    }

    fn project(&self, values: &mut [f64]) {
        let dot = self.dot(values);
        if dot > 0.0 {
            self.shift(values, -dot / self.norm_sq);
        }
    }

    /// Distance from `values` to the halfspace boundary, zero if inside.
    fn violation(&self, values: &[f64]) -> f64 {
        (self.dot(values).max(0.0)) / self.norm_sq.sqrt()
    }
}

impl Set {
    /// Projects `values` onto this set in place.
    pub(crate) fn project(&self, values: &mut [f64], shape: &[usize], scratch: &mut Vec<f64>) {
        match self {
            Self::Monotone { axis, direction } => {
                for_each_lane(shape, *axis, |start, stride, len| {
                    scratch.clear();
                    scratch.extend((0..len).map(|j| values[start + j * stride]));
                    project_monotone(scratch, *direction);
                    for (j, v) in scratch.iter().enumerate() {
                        values[start + j * stride] = *v;
                    }
                });
            }
            Self::Halfspace(halfspace) => halfspace.project(values),
            Self::Box(bounds) => {
                for v in values.iter_mut() {
                    *v = bounds.clamp(*v);
                }
            }
        }
    }

    /// Returns the largest violation of this set by `values`.
    pub(crate) fn violation(&self, values: &[f64], shape: &[usize]) -> f64 {
        match self {
            Self::Monotone { axis, direction } => {
                let mut worst: f64 = 0.0;
                for_each_lane(shape, *axis, |start, stride, len| {
                    for j in 1..len {
                        let step = values[start + j * stride] - values[start + (j - 1) * stride];
                        worst = worst.max(-direction.sign() * step);
                    }
                });
                worst
            }
            Self::Halfspace(halfspace) => halfspace.violation(values),
            Self::Box(bounds) => values
                .iter()
                .fold(0.0, |worst, v| worst.max(bounds.excess(*v))),
        }
    }

    /// Returns the largest `theta` in `[0, 1]` such that
    /// `from + theta * (to - from)` lies in this set.
    ///
    /// `from` should lie strictly inside the set; if it sits on the boundary of
    /// an inequality that `to` violates, the answer is zero.
    pub(crate) fn reach(&self, from: &[f64], to: &[f64], shape: &[usize]) -> f64 {
        match self {
            Self::Monotone { axis, direction } => {
                let mut theta: f64 = 1.0;
                for_each_lane(shape, *axis, |start, stride, len| {
                    for j in 1..len {
                        let (a, b) = (start + (j - 1) * stride, start + j * stride);
                        let fall = |y: &[f64]| direction.sign() * (y[a] - y[b]);
                        theta = theta.min(segment_limit(fall(from), fall(to)));
                    }
                });
                theta
            }
            Self::Halfspace(halfspace) => {
                segment_limit(halfspace.dot(from), halfspace.dot(to))
            }
            Self::Box(bounds) => from.iter().zip(to).fold(1.0, |theta, (&f, &t)| {
                let above = segment_limit(f - bounds.upper(), t - bounds.upper());
                let below = segment_limit(bounds.lower() - f, bounds.lower() - t);
                theta.min(above).min(below)
            }),
        }
    }

    pub(crate) fn is_halfspace(&self) -> bool {
        matches!(self, Self::Halfspace(_))
    }
}

/// Largest step along a segment that keeps an affine `g <= 0`, given `g` at
/// both ends.
fn segment_limit(start: f64, end: f64) -> f64 {
    if end <= 0.0 {
        1.0
    } else if start >= 0.0 {
        0.0
    } else {
        start / (start - end)
    }
}

/// Calls `f(start, stride, len)` for every lane parallel to `axis`.
pub(crate) fn for_each_lane(shape: &[usize], axis: usize, mut f: impl FnMut(usize, usize, usize)) {
    let len = shape[axis];
    let stride: usize = shape[axis + 1..].iter().product();
    let outer: usize = shape[..axis].iter().product();

    for o in 0..outer {
        for i in 0..stride {
            f(o * len * stride + i, stride, len);
        }
    }
}

/// Curvature inequalities for a 1-D sequence sampled at strictly increasing `xs`.
///
/// For convexity each interior keypoint `i` requires the slope on its left
/// to be at most the slope on its right.
pub(crate) fn sequence_curvature(xs: &[f64], curvature: Curvature) -> Vec<Set> {
    let sign = curvature.sign();
    (1..xs.len().saturating_sub(1))
        .map(|i| {
            let left = 1.0 / (xs[i] - xs[i - 1]);
            let right = 1.0 / (xs[i + 1] - xs[i]);
            Set::Halfspace(Halfspace::new(vec![
                (i - 1, -sign * left),
                (i, sign * (left + right)),
                (i + 1, -sign * right),
            ]))
        })
        .collect()
}

/// Curvature inequalities along every lane of a unit-spaced grid axis.
pub(crate) fn grid_curvature(shape: &[usize], axis: usize, curvature: Curvature) -> Vec<Set> {
    let sign = curvature.sign();
    let mut sets = Vec::new();
    for_each_lane(shape, axis, |start, stride, len| {
        for j in 1..len.saturating_sub(1) {
            sets.push(Set::Halfspace(Halfspace::new(vec![
                (start + (j - 1) * stride, -sign),
                (start + j * stride, 2.0 * sign),
                (start + (j + 1) * stride, -sign),
            ])));
        }
    });
    sets
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn lanes_cover_every_element_once() {
        let shape = [2, 3, 4];
        for axis in 0..3 {
            let mut seen = vec![0_usize; 24];
            for_each_lane(&shape, axis, |start, stride, len| {
                assert_eq!(len, shape[axis]);
                for j in 0..len {
                    seen[start + j * stride] += 1;
                }
            });
            assert!(seen.iter().all(|&count| count == 1), "axis {axis}");
        }
    }

    #[test]
    fn reach_stops_where_the_segment_leaves_the_set() {
        let bounds = Set::Box(Bounds::new(0.0, 1.0).unwrap());
        // Halfway from 0.5 to 1.5 is the upper bound.
        assert_relative_eq!(bounds.reach(&[0.5, 0.5], &[1.5, 0.75], &[2]), 0.5);
        assert_eq!(bounds.reach(&[0.5], &[0.9], &[1]), 1.0);

        let increasing = Set::Monotone {
            axis: 0,
            direction: Monotonicity::Increasing,
        };
        // The gap closes at a quarter of the way from [0, 1] to [0, -3].
        assert_relative_eq!(increasing.reach(&[0.0, 1.0], &[0.0, -3.0], &[2]), 0.25);

        // An anchor on the boundary cannot move toward an infeasible point.
        assert_eq!(increasing.reach(&[1.0, 1.0], &[1.0, 0.0], &[2]), 0.0);
    }

    #[test]
    fn monotone_set_projects_each_lane() {
        // 2 x 3 grid, rows decreasing along axis 1.
        let mut values = vec![3.0, 1.0, 2.0, 0.0, 5.0, 4.0];
        let set = Set::Monotone {
            axis: 1,
            direction: Monotonicity::Increasing,
        };

        set.project(&mut values, &[2, 3], &mut Vec::new());

        assert_eq!(values, vec![2.0, 2.0, 2.0, 0.0, 4.5, 4.5]);
        assert_eq!(set.violation(&values, &[2, 3]), 0.0);
    }

    #[test]
    fn halfspace_projection_lands_on_boundary() {
        let sets = sequence_curvature(&[0.0, 1.0, 2.0], Curvature::Convex);
        assert_eq!(sets.len(), 1);

        // A concave bump: slopes 1 then -1.
        let mut values = vec![0.0, 1.0, 0.0];
        sets[0].project(&mut values, &[3], &mut Vec::new());

        let left = values[1] - values[0];
        let right = values[2] - values[1];
        assert_relative_eq!(left, right, epsilon = 1e-12);
        assert_relative_eq!(sets[0].violation(&values, &[3]), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn corrected_step_with_zero_lambda_is_plain_projection() {
        let sets = sequence_curvature(&[0.0, 1.0, 3.0], Curvature::Concave);
        let Set::Halfspace(halfspace) = &sets[0] else {
            panic!("expected a halfspace");
        };

        let mut plain = vec![0.0, -1.0, 2.0];
        let mut corrected = plain.clone();
        let mut lambda = 0.0;

        halfspace.project(&mut plain);
        halfspace.project_corrected(&mut corrected, &mut lambda);

        for (p, c) in plain.iter().zip(&corrected) {
            assert_relative_eq!(p, c, epsilon = 1e-12);
        }
        assert!(lambda > 0.0);
    }

    #[test]
    fn grid_curvature_counts() {
        // Axis 0 of a 4 x 2 grid: 2 lanes with 2 interior points each.
        assert_eq!(grid_curvature(&[4, 2], 0, Curvature::Convex).len(), 4);
        // Axis of size 2 has no interior points.
        assert!(grid_curvature(&[4, 2], 1, Curvature::Convex).is_empty());
    }
}
