use crate::shape::Monotonicity;

/// Projects `values` onto the non-decreasing cone in place.
///
/// Pool-adjacent-violators: scan left to right, keeping a stack of pooled
/// blocks, and merge the top two blocks while their means are out of order.
/// The result is the exact L2-nearest non-decreasing sequence. Runs in
/// `O(n)` amortized time.
pub fn project_nondecreasing(values: &mut [f64]) {
    if values.len() < 2 {
        return;
    }

    // Each block is (sum, count); blocks are contiguous and in order.
    let mut blocks: Vec<(f64, usize)> = Vec::with_capacity(values.len());

    for &value in values.iter() {
        blocks.push((value, 1));
        while blocks.len() > 1 {
            let (sum_right, count_right) = blocks[blocks.len() - 1];
            let (sum_left, count_left) = blocks[blocks.len() - 2];
            if mean(sum_left, count_left) <= mean(sum_right, count_right) {
                break;
            }
            blocks.pop();
            let last = blocks.len() - 1;
            blocks[last] = (sum_left + sum_right, count_left + count_right);
        }
    }

    let mut start = 0;
    for (sum, count) in blocks {
        let level = mean(sum, count);
        values[start..start + count].fill(level);
        start += count;
    }
}

/// Projects `values` onto the monotone cone of the given direction in place.
///
/// Decreasing projections negate, project onto the non-decreasing cone, and
/// negate back, which is exact because negation is an isometry.
pub fn project_monotone(values: &mut [f64], direction: Monotonicity) {
    match direction {
        Monotonicity::Increasing => project_nondecreasing(values),
        Monotonicity::Decreasing => {
            negate(values);
            project_nondecreasing(values);
            negate(values);
        }
    }
}

fn negate(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = -*v;
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, count: usize) -> f64 {
    sum / count as f64
}
