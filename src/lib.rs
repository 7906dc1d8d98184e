mod common;
mod error;
mod findiff;
mod hessian;
mod ipm;
mod linesearch;
mod linsol;
mod math;
mod merit;
mod qp;
mod sparse;
mod sqp;
mod stats;
#[cfg(test)]
mod tests;
mod traits;

pub use common::*;
pub use error::*;
pub use findiff::*;
pub use hessian::{bfgs_reset, bfgs_update, gershgorin_regularization, regularize, BfgsUpdate};
pub use ipm::{ipm, IpmOptions, IpmQpSolver};
pub use linesearch::{line_search, LineSearch};
pub use merit::{l1_merit, primal_infeasibility, MeritHistory};
pub use qp::{QpProblem, QpSolution};
pub use sqp::sqp;
pub use stats::{IterationRecord, Stats, Timing};
pub use traits::*;
