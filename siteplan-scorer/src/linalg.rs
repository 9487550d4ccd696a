//! Dense linear algebra for the closed-form ridge fit.

use log::warn;
use ndarray::{Array1, Array2, Zip, s};

/// Pivot magnitude at or below which a column is treated as singular.
const SINGULAR_PIVOT: f64 = 1e-12;

/// Solution of a square linear system.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinearSolution {
    /// Solved unknowns; skipped columns hold `0.0`.
    pub(crate) values: Vec<f64>,
    /// Columns whose pivot was numerically zero.
    pub(crate) skipped: Vec<usize>,
}

/// Solve `a · x = b` by Gauss-Jordan elimination with partial pivoting.
///
/// Each step swaps the row with the largest absolute value in the pivot
/// column into place. A column whose best pivot is numerically zero is
/// skipped and its unknown reported as `0.0`.
#[expect(
    clippy::float_arithmetic,
    reason = "elimination divides by and subtracts multiples of the pivot"
)]
pub(crate) fn solve(a: &Array2<f64>, b: &Array1<f64>) -> LinearSolution {
    let n = a.nrows().min(a.ncols()).min(b.len());
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    aug.slice_mut(s![.., ..n]).assign(&a.slice(s![..n, ..n]));
    aug.column_mut(n).assign(&b.slice(s![..n]));
    let mut skipped = Vec::new();

    for col in 0..n {
        let (pivot, max_abs) = aug
            .column(col)
            .iter()
            .enumerate()
            .skip(col)
            .map(|(r, v)| (r, v.abs()))
            .fold((col, -1.0), |best, cand| if cand.1 > best.1 { cand } else { best });
        if max_abs <= SINGULAR_PIVOT {
            warn!("ridge system column {col} has no usable pivot; weight left at zero");
            skipped.push(col);
            continue;
        }
        if pivot != col {
            let (upper, lower) = aug.multi_slice_mut((s![col, ..], s![pivot, ..]));
            Zip::from(upper).and(lower).for_each(std::mem::swap);
        }

        let piv = aug.get((col, col)).copied().unwrap_or(1.0);
        aug.slice_mut(s![col, col..]).mapv_inplace(|v| v / piv);
        let pivot_row = aug.slice(s![col, col..]).to_owned();
        for (r, mut row) in aug.rows_mut().into_iter().enumerate() {
            if r == col {
                continue;
            }
            let factor = row.get(col).copied().unwrap_or(0.0);
            if factor == 0.0 {
                continue;
            }
            row.slice_mut(s![col..]).scaled_add(-factor, &pivot_row);
        }
    }

    let values = aug
        .column(n)
        .iter()
        .enumerate()
        .map(|(i, &v)| if skipped.contains(&i) { 0.0 } else { v })
        .collect();
    LinearSolution { values, skipped }
}
