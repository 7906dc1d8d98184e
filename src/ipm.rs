use anyhow::{bail, Result};
use log::{debug, trace};
use spsolve::rlu::RLU;
use spsolve::Solver;

use crate::linsol::{kkt_matrix, solve_symmetric};
use crate::math::{norm, norm_inf};
use crate::qp::{QpProblem, QpSolution};
use crate::sparse::row;
use crate::traits::QpSolver;

pub struct IpmOptions {
    /// Termination tolerance for feasibility condition.
    pub feas_tol: f64,
    /// Termination tolerance for gradient condition.
    pub grad_tol: f64,
    /// Termination tolerance for complementarity condition.
    pub comp_tol: f64,
    /// Termination tolerance for cost condition.
    pub cost_tol: f64,

    /// Maximum number of iterations.
    pub max_it: usize,

    /// Constant used in alpha updates.
    pub xi: f64,
    /// Centering parameter.
    pub sigma: f64,
    /// Used to initialize slack variables.
    pub z0: f64,
    /// Exits if either alpha parameter becomes smaller than this value.
    pub alpha_min: f64,
    /// Exits if the 2-norm of the reduced Newton step exceeds this value.
    pub max_step_size: f64,
}

impl Default for IpmOptions {
    fn default() -> Self {
        Self {
            feas_tol: 1e-9,
            grad_tol: 1e-9,
            comp_tol: 1e-9,
            cost_tol: 1e-9,

            max_it: 150,

            xi: 0.99995,
            sigma: 0.1,
            z0: 1.0,
            alpha_min: 1e-8,
            max_step_size: 1e10,
        }
    }
}

/// QP subproblem solver based on a primal-dual interior point method.
///
/// Newton systems are solved with the sparse linear solver `S`.
pub struct IpmQpSolver<S> {
    pub solver: S,
    pub opt: IpmOptions,
}

impl<S> IpmQpSolver<S> {
    pub fn new(solver: S, opt: IpmOptions) -> Self {
        Self { solver, opt }
    }
}

impl Default for IpmQpSolver<RLU> {
    fn default() -> Self {
        Self {
            solver: RLU::default(),
            opt: IpmOptions::default(),
        }
    }
}

impl<S> QpSolver for IpmQpSolver<S>
where
    S: Solver<usize, f64>,
{
    fn solve(&self, qp: &QpProblem, x0: &[f64]) -> Result<QpSolution> {
        ipm(qp, x0, &self.solver, &self.opt)
    }
}

/// Where a constraint row came from.
#[derive(Clone, Copy, Debug)]
enum Origin {
    Bound(usize),
    Linear(usize),
}

/// Constraint row `coef*x - rhs`, `== 0` for equalities and `<= 0` for
/// inequalities. `sign` maps its multiplier back onto the QP bounds.
struct Row {
    coef: Vec<(usize, f64)>,
    rhs: f64,
    origin: Origin,
    sign: f64,
}

impl Row {
    fn eval(&self, x: &[f64]) -> f64 {
        self.dot(x) - self.rhs
    }

    fn dot(&self, x: &[f64]) -> f64 {
        self.coef.iter().map(|&(j, v)| v * x[j]).sum()
    }
}

/// Splits variable bounds and linear constraints into equality and
/// inequality rows. Rows infinite on both sides are dropped.
fn split_constraints(qp: &QpProblem) -> (Vec<Row>, Vec<Row>) {
    let mut eq = Vec::new();
    let mut ineq = Vec::new();

    let mut classify = |l: f64, u: f64, coef: Vec<(usize, f64)>, origin: Origin| {
        if l.is_finite() && u.is_finite() && (u - l).abs() <= f64::EPSILON {
            eq.push(Row {
                coef,
                rhs: u,
                origin,
                sign: 1.0,
            });
            return;
        }
        if l.is_finite() {
            ineq.push(Row {
                coef: coef.iter().map(|&(j, v)| (j, -v)).collect(),
                rhs: -l,
                origin,
                sign: -1.0,
            });
        }
        if u.is_finite() {
            ineq.push(Row {
                coef,
                rhs: u,
                origin,
                sign: 1.0,
            });
        }
    };

    for j in 0..qp.nx() {
        classify(qp.lbx[j], qp.ubx[j], vec![(j, 1.0)], Origin::Bound(j));
    }
    for k in 0..qp.na() {
        classify(qp.lba[k], qp.uba[k], row(qp.a, k).collect(), Origin::Linear(k));
    }
    (eq, ineq)
}

/// Termination measures of the interior point iteration.
struct Conditions {
    feas: f64,
    grad: f64,
    comp: f64,
    cost: f64,
}

impl Conditions {
    fn satisfied(&self, opt: &IpmOptions) -> bool {
        self.feas < opt.feas_tol
            && self.grad < opt.grad_tol
            && self.comp < opt.comp_tol
            && self.cost < opt.cost_tol
    }
}

/// Primal-dual interior point method for the QP
///
/// ```txt
///       min 1/2 x'*H*x + g'*x
///        x
/// ```
///
/// subject to
///
/// ```txt
///       Ae*x - be = 0       (equality rows)
///       Ai*x - bi <= 0      (inequality rows)
/// ```
///
/// where the rows are built from the variable bounds and the linear
/// constraints of `qp`. Returns an error if the iteration fails numerically
/// or does not converge within `opt.max_it` iterations.
pub fn ipm<S>(qp: &QpProblem, x0: &[f64], solver: &S, opt: &IpmOptions) -> Result<QpSolution>
where
    S: Solver<usize, f64>,
{
    let nx = qp.nx();
    let (xi, sigma, z0) = (opt.xi, opt.sigma, opt.z0);
    if xi >= 1.0 || xi < 0.5 {
        bail!("xi ({}) must be slightly less than 1", xi);
    }
    if sigma > 1.0 || sigma <= 0.0 {
        bail!("sigma ({}) must be between 0 and 1", sigma);
    }
    if x0.len() != nx || qp.h.rows() != nx || qp.h.cols() != nx {
        bail!(
            "QP dimension mismatch: x0 has length {}, H is {}x{}, g has length {}",
            x0.len(),
            qp.h.rows(),
            qp.h.cols(),
            nx
        );
    }
    if qp.a.cols() != nx && qp.na() != 0 {
        bail!("constraint matrix has {} columns, expected {}", qp.a.cols(), nx);
    }

    let (eqs, ineqs) = split_constraints(qp);
    let neq = eqs.len();
    let niq = ineqs.len();

    let lagrangian_x = |x: &[f64], lam: &[f64], mu: &[f64]| -> Result<Vec<f64>> {
        let mut l_x = qp.h.mat_vec(x)?;
        l_x.iter_mut().zip(qp.g).for_each(|(l, &c)| *l += c);
        for (row, &m) in eqs.iter().zip(lam).chain(ineqs.iter().zip(mu)) {
            for &(j, v) in &row.coef {
                l_x[j] += v * m;
            }
        }
        Ok(l_x)
    };
    let conditions = |x: &[f64], z: &[f64], lam: &[f64], mu: &[f64], h: &[f64], g: &[f64]| {
        let l_x = lagrangian_x(x, lam, mu)?;
        let maxh = h.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let dot_zmu: f64 = z.iter().zip(mu).map(|(a, b)| a * b).sum();
        let feas = norm_inf(g).max(maxh) / (1.0 + norm_inf(x).max(norm_inf(z)));
        let grad = norm_inf(&l_x) / (1.0 + norm_inf(lam).max(norm_inf(mu)));
        let comp = dot_zmu / (1.0 + norm_inf(x));
        Ok::<_, anyhow::Error>((feas, grad, comp))
    };

    // Evaluate cost f(x0) and constraints g(x0), h(x0).
    let mut x = x0.to_vec();
    let mut f = qp.objective(&x)?;
    let mut h: Vec<f64> = ineqs.iter().map(|r| r.eval(&x)).collect();
    let mut g: Vec<f64> = eqs.iter().map(|r| r.eval(&x)).collect();

    // Initialize gamma, lam, mu, z.
    let mut gamma = 1.0; // barrier coefficient
    let mut lam = vec![0.0; neq];
    let mut z: Vec<f64> = h
        .iter()
        .map(|&hk| if hk < -z0 { -hk } else { z0 })
        .collect();
    let mut mu: Vec<f64> = z
        .iter()
        .map(|&zk| if gamma / zk > z0 { gamma / zk } else { z0 })
        .collect();

    let mut f0 = f;
    let (feas, grad, comp) = conditions(&x, &z, &lam, &mu, &h, &g)?;
    let mut cond = Conditions {
        feas,
        grad,
        comp,
        cost: 0.0,
    };
    let mut converged = cond.satisfied(opt);
    let mut iterations = 0;

    // Newton iterations.
    while !converged && iterations < opt.max_it {
        iterations += 1;

        // M = H + Ai' * diag(mu/z) * Ai
        // N = Lx + Ai' * diag(1/z) * (mu.*h + gamma)
        let mut m = qp.h.to_coo();
        let mut n = lagrangian_x(&x, &lam, &mu)?;
        for (k, row) in ineqs.iter().enumerate() {
            let d = mu[k] / z[k];
            for &(a, va) in &row.coef {
                for &(b, vb) in &row.coef {
                    m.push(a, b, d * va * vb);
                }
            }
            let w = (mu[k] * h[k] + gamma) / z[k];
            for &(j, v) in &row.coef {
                n[j] += v * w;
            }
        }
        let ae_rows: Vec<&[(usize, f64)]> = eqs.iter().map(|r| r.coef.as_slice()).collect();
        let kkt = kkt_matrix(nx, &m, &ae_rows);

        let mut dxdlam: Vec<f64> = n.iter().chain(&g).map(|v| -v).collect();
        solve_symmetric(solver, &kkt, &mut dxdlam)?;
        if dxdlam.iter().any(|v| v.is_nan()) || norm(&dxdlam) > opt.max_step_size {
            bail!("did not converge: numerically failed (Newton step)");
        }
        let (dx, dlam) = dxdlam.split_at(nx);

        let dz: Vec<f64> = ineqs
            .iter()
            .enumerate()
            .map(|(k, row)| -h[k] - z[k] - row.dot(dx))
            .collect();
        let dmu: Vec<f64> = (0..niq)
            .map(|k| -mu[k] + (gamma - mu[k] * dz[k]) / z[k])
            .collect();

        // Fraction to the boundary.
        let alphap = step_length(xi, &z, &dz);
        let alphad = step_length(xi, &mu, &dmu);

        x.iter_mut().zip(dx).for_each(|(v, d)| *v += alphap * d);
        z.iter_mut().zip(&dz).for_each(|(v, d)| *v += alphap * d);
        lam.iter_mut().zip(dlam).for_each(|(v, d)| *v += alphad * d);
        mu.iter_mut().zip(&dmu).for_each(|(v, d)| *v += alphad * d);
        if niq > 0 {
            gamma = sigma * z.iter().zip(&mu).map(|(a, b)| a * b).sum::<f64>() / (niq as f64);
        }

        // Evaluate cost and constraints.
        f = qp.objective(&x)?;
        h = ineqs.iter().map(|r| r.eval(&x)).collect();
        g = eqs.iter().map(|r| r.eval(&x)).collect();

        let (feas, grad, comp) = conditions(&x, &z, &lam, &mu, &h, &g)?;
        cond = Conditions {
            feas,
            grad,
            comp,
            cost: (f - f0).abs() / (1.0 + f0.abs()),
        };
        trace!(
            "ipm {:>3} f={:e} feas={:e} grad={:e} comp={:e} cost={:e} gamma={:e} alpha=({}, {})",
            iterations,
            f,
            cond.feas,
            cond.grad,
            cond.comp,
            cond.cost,
            gamma,
            alphap,
            alphad
        );

        if cond.satisfied(opt) {
            converged = true;
        } else {
            if x.iter().any(|v| v.is_nan())
                || alphap < opt.alpha_min
                || alphad < opt.alpha_min
                || gamma < f64::EPSILON
                || gamma > 1.0 / f64::EPSILON
            {
                bail!("did not converge: numerically failed");
            }
            f0 = f;
        }
    }
    if !converged {
        bail!("did not converge in {} iterations", iterations);
    }
    debug!("QP solved in {} interior point iterations", iterations);

    // Map multipliers back onto the bounds of the QP.
    let mut lam_x = vec![0.0; nx];
    let mut lam_a = vec![0.0; qp.na()];
    for (row, &m) in eqs.iter().zip(&lam).chain(ineqs.iter().zip(&mu)) {
        match row.origin {
            Origin::Bound(j) => lam_x[j] += row.sign * m,
            Origin::Linear(k) => lam_a[k] += row.sign * m,
        }
    }

    Ok(QpSolution { x, lam_x, lam_a })
}

/// `min(xi * min(v(k) ./ -dv(k)), 1)` over all `k` with `dv(k) < 0`.
fn step_length(xi: f64, v: &[f64], dv: &[f64]) -> f64 {
    v.iter()
        .zip(dv)
        .filter(|&(_, &d)| d < 0.0)
        .map(|(&vk, &dk)| xi * (vk / -dk))
        .fold(1.0, f64::min)
}
