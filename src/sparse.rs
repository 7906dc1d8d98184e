use anyhow::Result;
use sparsetools::coo::Coo;
use sparsetools::csr::CSR;

use crate::math::dot;

/// Every entry structurally present, scaled identity values.
pub(crate) fn dense_identity(n: usize, scale: f64) -> CSR<usize, f64> {
    let mut coo = Coo::with_capacity(n, n, n * n);
    for i in 0..n {
        for j in 0..n {
            coo.push(i, j, if i == j { scale } else { 0.0 });
        }
    }
    coo.to_csr()
}

/// Returns a copy of `a` whose pattern is joined with the diagonal.
/// Duplicates are summed and column indexes come out sorted.
pub(crate) fn with_diagonal(a: &CSR<usize, f64>) -> CSR<usize, f64> {
    let mut coo = a.to_coo();
    for i in 0..a.rows().min(a.cols()) {
        coo.push(i, i, 0.0);
    }
    coo.to_csr()
}

/// Iterates over the stored entries of row `i` as `(col, value)`.
pub(crate) fn row(a: &CSR<usize, f64>, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    let range = a.rowptr()[i]..a.rowptr()[i + 1];
    a.colidx()[range.clone()]
        .iter()
        .copied()
        .zip(a.values()[range].iter().copied())
}

/// Quadratic form `x' * A * x`.
pub(crate) fn quad_form(a: &CSR<usize, f64>, x: &[f64]) -> Result<f64> {
    Ok(dot(x, &a.mat_vec(x)?))
}

/// Calls `op(i, j, &mut a[i,j])` for every stored entry. The pattern is
/// left untouched.
fn update_stored<F>(a: &mut CSR<usize, f64>, mut op: F)
where
    F: FnMut(usize, usize, &mut f64),
{
    let mut entries = Vec::with_capacity(a.nnz());
    for i in 0..a.rows() {
        for k in a.rowptr()[i]..a.rowptr()[i + 1] {
            entries.push((i, a.colidx()[k]));
        }
    }
    for ((i, j), v) in entries.into_iter().zip(a.values_mut()) {
        op(i, j, v);
    }
}

/// Adds `delta` to every stored diagonal entry.
pub(crate) fn add_to_diagonal(a: &mut CSR<usize, f64>, delta: f64) {
    update_stored(a, |i, j, v| {
        if i == j {
            *v += delta;
        }
    });
}

/// Zeroes all stored off-diagonal entries.
pub(crate) fn clear_off_diagonal(a: &mut CSR<usize, f64>) {
    update_stored(a, |i, j, v| {
        if i != j {
            *v = 0.0;
        }
    });
}

/// Adds `alpha * u * v'` restricted to the stored pattern.
pub(crate) fn rank_one_update(a: &mut CSR<usize, f64>, alpha: f64, u: &[f64], v: &[f64]) {
    update_stored(a, |i, j, aij| *aij += alpha * u[i] * v[j]);
}
