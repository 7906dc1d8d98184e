use sparsetools::csr::CSR;

use crate::error::EvaluationError;
use crate::traits::{NonlinearConstraint, ObjectiveFunction};

/// Default perturbation size.
pub const STEPSIZE: f64 = 1e-8;

/// Central difference of `phi` along every coordinate direction:
/// `(phi(x + h/2*e_i) - phi(x - h/2*e_i)) / h`. Returns one column per
/// direction.
fn central_diff<P>(x: &[f64], h: f64, mut phi: P) -> Result<Vec<Vec<f64>>, EvaluationError>
where
    P: FnMut(&[f64]) -> Result<Vec<f64>, EvaluationError>,
{
    let mut x_pert = x.to_vec();
    let mut columns = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        x_pert[i] = x[i] + h / 2.0;
        let fwd = phi(&x_pert)?;
        x_pert[i] = x[i] - h / 2.0;
        let bwd = phi(&x_pert)?;
        x_pert[i] = x[i];

        columns.push(fwd.iter().zip(&bwd).map(|(a, b)| (a - b) / h).collect());
    }
    Ok(columns)
}

/// Objective function with a gradient approximated by central differences.
pub struct FiniteDifferenceObjective<F> {
    f: F,
    h: f64,
}

impl<F> FiniteDifferenceObjective<F>
where
    F: Fn(&[f64]) -> Result<f64, EvaluationError>,
{
    pub fn new(f: F) -> Self {
        Self { f, h: STEPSIZE }
    }

    pub fn with_stepsize(f: F, h: f64) -> Self {
        Self { f, h }
    }
}

impl<F> ObjectiveFunction for FiniteDifferenceObjective<F>
where
    F: Fn(&[f64]) -> Result<f64, EvaluationError>,
{
    fn f(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        (self.f)(x)
    }

    fn grad(&self, x: &[f64]) -> Result<(f64, Vec<f64>), EvaluationError> {
        let f = (self.f)(x)?;
        let columns = central_diff(x, self.h, |xp| Ok(vec![(self.f)(xp)?]))?;
        Ok((f, columns.into_iter().map(|c| c[0]).collect()))
    }
}

/// Nonlinear constraints with a dense Jacobian approximated by central
/// differences.
pub struct FiniteDifferenceConstraint<G> {
    g: G,
    h: f64,
}

impl<G> FiniteDifferenceConstraint<G>
where
    G: Fn(&[f64]) -> Result<Vec<f64>, EvaluationError>,
{
    pub fn new(g: G) -> Self {
        Self { g, h: STEPSIZE }
    }

    pub fn with_stepsize(g: G, h: f64) -> Self {
        Self { g, h }
    }
}

impl<G> NonlinearConstraint for FiniteDifferenceConstraint<G>
where
    G: Fn(&[f64]) -> Result<Vec<f64>, EvaluationError>,
{
    fn g(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        (self.g)(x)
    }

    fn jac(&self, x: &[f64]) -> Result<(Vec<f64>, CSR<usize, f64>), EvaluationError> {
        let g = (self.g)(x)?;
        let columns = central_diff(x, self.h, |xp| (self.g)(xp))?;
        let rows: Vec<Vec<f64>> = (0..g.len())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        let jac = if rows.is_empty() {
            CSR::with_size(0, x.len())
        } else {
            CSR::from_dense(&rows)
        };
        Ok((g, jac))
    }
}
