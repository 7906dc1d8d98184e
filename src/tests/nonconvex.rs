use float_cmp::assert_approx_eq;

use sparsetools::csr::CSR;

use crate::{
    sqp, EvaluationError, IpmQpSolver, LagrangianHessian, ObjectiveFunction, Options, Status,
};

/// Double well coupled to a quadratic:
///
/// ```txt
///     f(x) = x_1^4/4 - x_1^2/2 + (x_2 - x_1)^2/2
/// ```
///
/// with minima at `(1, 1)` and `(-1, -1)`. The Hessian is indefinite for
/// `|x_1| < 1/sqrt(3)`.
struct DoubleWell {}

impl ObjectiveFunction for DoubleWell {
    fn f(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(x[0].powi(4) / 4.0 - x[0].powi(2) / 2.0 + (x[1] - x[0]).powi(2) / 2.0)
    }

    fn grad(&self, x: &[f64]) -> Result<(f64, Vec<f64>), EvaluationError> {
        let df = vec![x[0].powi(3) - x[0] - (x[1] - x[0]), x[1] - x[0]];
        Ok((self.f(x)?, df))
    }
}

impl LagrangianHessian for DoubleWell {
    fn hess(&self, x: &[f64], _lam: &[f64], sigma: f64) -> Result<CSR<usize, f64>, EvaluationError> {
        let d2f = CSR::from_dense(&[vec![3.0 * x[0].powi(2), -1.0], vec![-1.0, 1.0]]);
        Ok(d2f * sigma)
    }
}

#[test]
fn regularized_newton_leaves_indefinite_region() {
    let problem = DoubleWell {};
    let qp_solver = IpmQpSolver::default();
    let opt = Options {
        regularize: true,
        ..Default::default()
    };

    let sol = sqp(
        &problem,
        &[0.1, 0.5],
        &[f64::NEG_INFINITY; 2],
        &[f64::INFINITY; 2],
        None,
        &[],
        &[],
        Some(&problem),
        None,
        &qp_solver,
        &opt,
        None,
    )
    .unwrap();

    assert_eq!(sol.status, Status::Converged);
    assert!(sol.stats.iter_count <= 10);
    assert_approx_eq!(f64, sol.x[0], 1.0, epsilon = 1e-6);
    assert_approx_eq!(f64, sol.x[1], 1.0, epsilon = 1e-6);
    assert_approx_eq!(f64, sol.f, -0.25, epsilon = 1e-9);

    // Row 1 of the Hessian at x0 gives the bound 0.03 - 1.
    let records = &sol.stats.iterations;
    assert_approx_eq!(f64, records[0].regularization, 0.97, epsilon = 1e-12);
    // At (1, 1) every Gershgorin disc is in the right half plane.
    assert_eq!(records[records.len() - 1].regularization, 0.0);
    assert_eq!(sol.stats.eval_h.calls, records.len());
}
