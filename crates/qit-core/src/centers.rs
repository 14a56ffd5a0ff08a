use ndarray::{Array2, ArrayView2};

use crate::trajectory::Positions;

/// Unweighted mean position of the rows of one `[particle, axis]` block.
///
/// An empty block yields NaN components.
pub fn center_of_positions(block: ArrayView2<'_, f64>) -> [f64; 3] {
    let mut sum = [0.0f64; 3];
    for row in block.rows() {
        sum[0] += row[0];
        sum[1] += row[1];
        sum[2] += row[2];
    }
    let n = block.nrows() as f64;
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Center of charge per step, shape `[step, 3]`.
///
/// Every particle counts equally: neither charge nor mass weights the mean.
pub fn center_of_charge(positions: &Positions) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((positions.n_steps(), 3));
    for (step, block) in positions.steps().enumerate() {
        let c = center_of_positions(block);
        out[[step, 0]] = c[0];
        out[[step, 1]] = c[1];
        out[[step, 2]] = c[2];
    }
    out
}
