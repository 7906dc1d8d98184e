use std::fmt;

use crate::stats::Stats;

/// Lagrange multipliers on the nonlinear constraints and the variable bounds.
///
/// A positive multiplier indicates an active upper bound, a negative one an
/// active lower bound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lambda {
    /// Multipliers on the nonlinear constraints `gmin <= g(x) <= gmax`.
    pub g: Vec<f64>,
    /// Multipliers on the variable bounds `xmin <= x <= xmax`.
    pub x: Vec<f64>,
}

impl Lambda {
    pub fn zeros(nx: usize, ng: usize) -> Self {
        Self {
            g: vec![0.0; ng],
            x: vec![0.0; nx],
        }
    }
}

/// Source of the curvature information used in the QP subproblems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HessianApproximation {
    /// Evaluate the Hessian of the Lagrangian.
    Exact,
    /// Damped BFGS approximation with periodic diagonal resets.
    LimitedMemory,
}

/// Terminal status of a solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Converged,
    MaxIterationsExceeded,
    StepTooSmall,
    UserRequestedStop,
}

impl Status {
    pub fn is_success(&self) -> bool {
        *self == Status::Converged
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Converged => "Solve_Succeeded",
            Status::MaxIterationsExceeded => "Maximum_Iterations_Exceeded",
            Status::StepTooSmall => "Search_Direction_Becomes_Too_Small",
            Status::UserRequestedStop => "User_Requested_Stop",
        };
        f.write_str(s)
    }
}

/// Result of an SQP solve.
#[derive(Clone, Debug)]
pub struct Solution {
    /// Final iterate.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub f: f64,
    /// Nonlinear constraint values at `x`.
    pub g: Vec<f64>,
    pub lambda: Lambda,
    pub status: Status,
    pub stats: Stats,
}

#[derive(Clone, Debug)]
pub struct Options {
    /// Maximum number of SQP iterations.
    pub max_iter: usize,
    /// Maximum number of line-search trials. Zero disables the line search
    /// and full steps are taken.
    pub max_iter_ls: usize,

    /// Stopping criterion for primal infeasibility.
    pub tol_pr: f64,
    /// Stopping criterion for dual infeasibility.
    pub tol_du: f64,

    /// Armijo condition, coefficient of decrease in merit.
    pub c1: f64,
    /// Line-search parameter, restoration factor of stepsize.
    pub beta: f64,
    /// Size of memory to store history of merit function values.
    pub merit_memory: usize,

    /// Number of iterations between resets of the BFGS approximation
    /// to its diagonal.
    pub lbfgs_memory: usize,
    /// Automatic regularization of the Lagrange Hessian.
    pub regularize: bool,

    /// The size (inf-norm) of the step should not become smaller than this.
    pub min_step_size: f64,

    pub hessian_approximation: HessianApproximation,

    /// BFGS updates are skipped when `|s'y|` or `|s'Bs|` fall below this value.
    pub min_curvature: f64,

    /// Log the header with problem statistics.
    pub print_header: bool,
    /// Log a line per iteration.
    pub print_iteration: bool,
    /// Log information about execution time.
    pub print_time: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_iter: 50,
            max_iter_ls: 3,

            tol_pr: 1e-6,
            tol_du: 1e-6,

            c1: 1e-4,
            beta: 0.8,
            merit_memory: 4,

            lbfgs_memory: 10,
            regularize: false,

            min_step_size: 1e-10,

            hessian_approximation: HessianApproximation::Exact,

            min_curvature: 1e-14,

            print_header: true,
            print_iteration: true,
            print_time: true,
        }
    }
}

impl Options {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(format!("beta ({}) must be between 0 and 1", self.beta));
        }
        if !(self.c1 > 0.0 && self.c1 < 1.0) {
            return Err(format!("c1 ({}) must be between 0 and 1", self.c1));
        }
        if self.merit_memory == 0 {
            return Err("merit_memory must be at least 1".to_string());
        }
        if self.lbfgs_memory == 0 {
            return Err("lbfgs_memory must be at least 1".to_string());
        }
        if self.min_curvature < 0.0 {
            return Err(format!(
                "min_curvature ({}) must not be negative",
                self.min_curvature
            ));
        }
        Ok(())
    }
}
