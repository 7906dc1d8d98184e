use float_cmp::assert_approx_eq;
use full::Arr;
use sparsetools::coo::Coo;
use sparsetools::csr::CSR;
use std::iter::zip;

use crate::{
    sqp, EvaluationError, HessianApproximation, IpmQpSolver, LagrangianHessian,
    NonlinearConstraint, ObjectiveFunction, Options, Solution, Status,
};

/// Hock & Schittkowski test problem #71
///
/// ```txt
///     min x1*x4*(x1 + x2 + x3) + x3
///     s.t. x1*x2*x3*x4 >= 25
///          x1^2 + x2^2 + x3^2 + x4^2 = 40
///          1 <= x <= 5
/// ```
struct Constrained4DNonlinear {}

impl Constrained4DNonlinear {
    fn objective_hessian(&self, x: &[f64]) -> CSR<usize, f64> {
        CSR::from_dense(&[
            vec![2.0 * x[3], x[3], x[3], 2.0 * x[0] + x[1] + x[2]],
            vec![x[3], 0.0, 0.0, x[0]],
            vec![x[3], 0.0, 0.0, x[0]],
            vec![2.0 * x[0] + x[1] + x[2], x[0], x[0], 0.0],
        ])
    }
}

impl ObjectiveFunction for Constrained4DNonlinear {
    fn f(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(x[0] * x[3] * x[..3].iter().sum::<f64>() + x[2])
    }

    fn grad(&self, x: &[f64]) -> Result<(f64, Vec<f64>), EvaluationError> {
        let df = vec![
            x[0] * x[3] + x[3] * x[..3].iter().sum::<f64>(),
            x[0] * x[3],
            x[0] * x[3] + 1.0,
            x[0] * x[..3].iter().sum::<f64>(),
        ];
        Ok((self.f(x)?, df))
    }
}

impl NonlinearConstraint for Constrained4DNonlinear {
    fn g(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        let x = Arr::with_vec(x.to_vec());
        Ok(vec![x.prod(), x.pow(2).sum()])
    }

    fn jac(&self, x: &[f64]) -> Result<(Vec<f64>, CSR<usize, f64>), EvaluationError> {
        let g = self.g(x)?;
        let x = Arr::with_vec(x.to_vec());
        let dg = CSR::from_dense(&[(1.0 / &x * x.prod()).vec(), (&x * 2.0).vec()]);
        Ok((g, dg))
    }
}

impl LagrangianHessian for Constrained4DNonlinear {
    fn hess(&self, x: &[f64], lam: &[f64], sigma: f64) -> Result<CSR<usize, f64>, EvaluationError> {
        let l_xx: CSR<usize, f64> = self.objective_hessian(x) * sigma
            + CSR::from_dense(&[
                vec![0.0, x[2] * x[3], x[1] * x[3], x[1] * x[2]],
                vec![x[2] * x[3], 0.0, x[0] * x[3], x[0] * x[2]],
                vec![x[1] * x[3], x[0] * x[3], 0.0, x[0] * x[1]],
                vec![x[1] * x[2], x[0] * x[2], x[0] * x[1], 0.0],
            ]) * lam[0]
            + Coo::identity(4).to_csr() * lam[1] * 2.0;
        Ok(l_xx)
    }
}

fn solve(opt: &Options) -> Solution {
    let f7 = Constrained4DNonlinear {};

    let x0 = vec![1.0, 5.0, 5.0, 1.0];
    let size = x0.len();
    let xmin = vec![1.0; size];
    let xmax = vec![5.0; size];

    let qp_solver = IpmQpSolver::default();
    sqp(
        &f7,
        &x0,
        &xmin,
        &xmax,
        Some(&f7),
        &[25.0, 40.0],
        &[f64::INFINITY, 40.0],
        Some(&f7),
        None,
        &qp_solver,
        opt,
        None,
    )
    .unwrap()
}

fn assert_solution(sol: &Solution) {
    assert_eq!(sol.status, Status::Converged);
    assert_approx_eq!(f64, sol.f, 17.0140173, epsilon = 1e-6);
    zip(&sol.x, [1.0, 4.7429994, 3.8211503, 1.3794082])
        .for_each(|(&x, y)| assert_approx_eq!(f64, x, y, epsilon = 1e-5));
    zip(&sol.g, [25.0, 40.0]).for_each(|(&g, y)| assert_approx_eq!(f64, g, y, epsilon = 1e-6));
    // Lower side of the product constraint and the lower bound on x1 are active.
    zip(&sol.lambda.g, [-0.55229366, 0.16146857])
        .for_each(|(&l, y)| assert_approx_eq!(f64, l, y, epsilon = 1e-5));
    zip(&sol.lambda.x, [-1.08787121, 0.0, 0.0, 0.0])
        .for_each(|(&l, y)| assert_approx_eq!(f64, l, y, epsilon = 1e-5));
}

#[test]
fn constrained_4d_nonlinear() {
    let sol = solve(&Options::default());

    assert_solution(&sol);
    assert!(sol.stats.iter_count <= 10);
}

#[test]
fn constrained_4d_nonlinear_bfgs() {
    let opt = Options {
        hessian_approximation: HessianApproximation::LimitedMemory,
        ..Default::default()
    };
    let sol = solve(&opt);

    assert_solution(&sol);
    assert_eq!(sol.stats.eval_h.calls, 0);

    // The merit penalty follows the growing multiplier estimates and never
    // decreases.
    let sigma: Vec<f64> = sol.stats.iterations.iter().map(|rec| rec.sigma).collect();
    assert_eq!(sigma[0], 0.0);
    assert!(sigma.windows(2).all(|w| w[0] <= w[1]));
    assert!(sigma[sigma.len() - 1] > sigma[1]);
    assert!(sigma[sigma.len() - 1] > 1.0);
}
