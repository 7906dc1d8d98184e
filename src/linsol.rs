use anyhow::{anyhow, Result};
use sparsetools::coo::Coo;
use sparsetools::csr::CSR;
use spsolve::Solver;

/// Assembles the symmetric Newton (KKT) matrix
///
/// ```txt
///       [ M   Ae' ]
///       [ Ae  0   ]
/// ```
///
/// from `M` (order `nx`, duplicates allowed) and the sparse rows of `Ae`.
/// The diagonal is always stored so that the pattern is structurally
/// non-singular where possible.
pub(crate) fn kkt_matrix(
    nx: usize,
    m: &Coo<usize, f64>,
    ae_rows: &[&[(usize, f64)]],
) -> CSR<usize, f64> {
    let n = nx + ae_rows.len();
    let mut kkt = Coo::with_capacity(n, n, m.nnz() + n);
    kkt.extend(m.rowidx(), m.colidx(), m.values());
    for i in 0..n {
        kkt.push(i, i, 0.0);
    }
    for (r, row) in ae_rows.iter().enumerate() {
        for &(j, v) in row.iter() {
            kkt.push(nx + r, j, v);
            kkt.push(j, nx + r, v);
        }
    }
    kkt.to_csr()
}

/// Solves `K x = b` in place for a symmetric `K`.
///
/// For a symmetric matrix the compressed row arrays are also valid
/// compressed column arrays, so they are passed to the solver unchanged.
pub(crate) fn solve_symmetric<S>(solver: &S, k: &CSR<usize, f64>, b: &mut [f64]) -> Result<()>
where
    S: Solver<usize, f64>,
{
    if k.rows() != k.cols() || b.len() != k.rows() {
        return Err(anyhow!(
            "KKT system dimension mismatch: {}x{} with rhs {}",
            k.rows(),
            k.cols(),
            b.len()
        ));
    }
    solver
        .solve(k.cols(), k.colidx(), k.rowptr(), k.values(), b, false)
        .map_err(|err| anyhow!("linear solve failed: {}", err))
}
