use sparsetools::csr::CSR;

use crate::error::EvaluationError;
use crate::qp::{QpProblem, QpSolution};

pub trait ObjectiveFunction {
    /// Objective value at `x`.
    fn f(&self, x: &[f64]) -> Result<f64, EvaluationError>;

    /// Objective value and gradient at `x`.
    fn grad(&self, x: &[f64]) -> Result<(f64, Vec<f64>), EvaluationError>;
}

pub trait NonlinearConstraint {
    /// Constraint values at `x`.
    fn g(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError>;

    /// Constraint values and the `ng x nx` constraint Jacobian at `x`.
    fn jac(&self, x: &[f64]) -> Result<(Vec<f64>, CSR<usize, f64>), EvaluationError>;
}

pub trait LagrangianHessian {
    /// Hessian of `sigma * f(x) + lam' * g(x)` with respect to `x`.
    fn hess(&self, x: &[f64], lam: &[f64], sigma: f64)
        -> Result<CSR<usize, f64>, EvaluationError>;
}

/// Solves the quadratic subproblems of the SQP method.
pub trait QpSolver {
    /// Returns a KKT point of `qp`, starting from the primal guess `x0`.
    fn solve(&self, qp: &QpProblem, x0: &[f64]) -> anyhow::Result<QpSolution>;
}

/// Snapshot of the current iterate passed to an [`IterationCallback`].
pub struct IterationSnapshot<'a> {
    pub iter: usize,
    pub f: f64,
    pub x: &'a [f64],
    pub g: &'a [f64],
    pub lam_g: &'a [f64],
    pub lam_x: &'a [f64],
    /// Primal infeasibility.
    pub inf_pr: f64,
    /// Infinity norm of the Lagrangian gradient.
    pub inf_du: f64,
    /// Infinity norm of the previous step.
    pub d_norm: f64,
    /// Line-search trials in the previous iteration.
    pub ls_trials: usize,
}

/// Called once per iteration of the solver, before the convergence
/// check. Returning `true` stops the solver with
/// [`Status::UserRequestedStop`](crate::Status::UserRequestedStop).
pub trait IterationCallback {
    fn update(&self, snapshot: &IterationSnapshot) -> bool;
}

impl<F> IterationCallback for F
where
    F: Fn(&IterationSnapshot) -> bool,
{
    fn update(&self, snapshot: &IterationSnapshot) -> bool {
        self(snapshot)
    }
}
