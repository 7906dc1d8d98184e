use anyhow::Result;
use sparsetools::csr::CSR;

use crate::sparse::quad_form;

/// Quadratic program passed to a [`QpSolver`](crate::QpSolver):
///
/// ```txt
///       min 1/2 x'*H*x + g'*x
///        x
/// ```
///
/// subject to
///
/// ```txt
///       lba <= A*x <= uba   (linear constraints)
///       lbx <= x <= ubx     (variable bounds)
/// ```
///
/// Infinite bounds are allowed and mean the side is unbounded.
pub struct QpProblem<'a> {
    /// Symmetric `nx x nx` Hessian, both triangles stored.
    pub h: &'a CSR<usize, f64>,
    pub g: &'a [f64],
    pub lbx: &'a [f64],
    pub ubx: &'a [f64],
    /// `na x nx` constraint matrix.
    pub a: &'a CSR<usize, f64>,
    pub lba: &'a [f64],
    pub uba: &'a [f64],
}

impl QpProblem<'_> {
    pub fn nx(&self) -> usize {
        self.g.len()
    }

    pub fn na(&self) -> usize {
        self.a.rows()
    }

    /// Objective value at `x`.
    pub fn objective(&self, x: &[f64]) -> Result<f64> {
        Ok(0.5 * quad_form(self.h, x)? + crate::math::dot(self.g, x))
    }
}

/// Primal-dual solution of a [`QpProblem`].
///
/// Multipliers follow the convention of the Lagrangian
/// `f + lam_a'*(A*x) + lam_x'*x`: positive for active upper bounds,
/// negative for active lower bounds.
#[derive(Clone, Debug, Default)]
pub struct QpSolution {
    pub x: Vec<f64>,
    pub lam_x: Vec<f64>,
    pub lam_a: Vec<f64>,
}
