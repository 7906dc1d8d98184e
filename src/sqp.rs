use std::time::Instant;

use log::{debug, info, trace, warn};
use sparsetools::csr::CSR;

use crate::common::{HessianApproximation, Lambda, Options, Solution, Status};
use crate::error::{EvaluationError, SqpError, SqpResult};
use crate::hessian::{bfgs_reset, bfgs_update, regularize};
use crate::linesearch::line_search;
use crate::math::{blend, dot, norm_inf, sub};
use crate::merit::{l1_merit, primal_infeasibility, MeritHistory};
use crate::qp::QpProblem;
use crate::sparse::{dense_identity, quad_form, with_diagonal};
use crate::stats::{log_iteration, log_iteration_header, IterationRecord, Stats};
use crate::traits::*;

/// Sequential quadratic programming method for NLP (nonlinear programming).
/// Minimize a function F(x) beginning from a starting point x0, subject
/// to optional nonlinear constraints and variable bounds.
///
/// ```txt
///       min F(x)
///        x
/// ```
///
/// subject to
///
/// ```txt
///       gmin <= g(x) <= gmax   (nonlinear constraints)
///       xmin <= x <= xmax      (variable bounds)
/// ```
///
/// Each iteration solves a QP built from the constraint linearization and
/// the exact (or BFGS approximated) Hessian of the Lagrangian, then
/// globalizes the step with a line search on the L1 merit function.
///
/// `lam0` supplies initial multiplier estimates (zero if `None`). The
/// `callback` is invoked once per iteration and may stop the solver.
///
/// Returns the final iterate together with a terminal [`Status`]. Errors are
/// returned only for invalid input, failed evaluations outside the line
/// search and failed QP solves.
pub fn sqp(
    f_fn: &dyn ObjectiveFunction,
    x0: &[f64],
    xmin: &[f64],
    xmax: &[f64],
    nonlinear: Option<&dyn NonlinearConstraint>,
    gmin: &[f64],
    gmax: &[f64],
    hessian: Option<&dyn LagrangianHessian>,
    lam0: Option<&Lambda>,
    qp_solver: &dyn QpSolver,
    opt: &Options,
    callback: Option<&dyn IterationCallback>,
) -> SqpResult<Solution> {
    let nx = x0.len();
    let ng = gmin.len();

    opt.validate().map_err(SqpError::InvalidProblem)?;
    check_bounds("x", nx, xmin, xmax)?;
    check_bounds("g", ng, gmin, gmax)?;
    if nonlinear.is_none() && ng != 0 {
        return Err(SqpError::InvalidProblem(format!(
            "{} constraint bounds given without nonlinear constraints",
            ng
        )));
    }
    let exact_hessian = opt.hessian_approximation == HessianApproximation::Exact;
    if exact_hessian && hessian.is_none() {
        return Err(SqpError::InvalidProblem(
            "exact Hessian requested but no Lagrangian Hessian given".to_string(),
        ));
    }
    let lam0 = match lam0 {
        Some(lam0) => {
            if lam0.x.len() != nx || lam0.g.len() != ng {
                return Err(SqpError::InvalidProblem(format!(
                    "initial multipliers must have dimensions {} and {}, got {} and {}",
                    nx,
                    ng,
                    lam0.x.len(),
                    lam0.g.len()
                )));
            }
            lam0.clone()
        }
        None => Lambda::zeros(nx, ng),
    };

    let ev = Evaluator {
        f_fn,
        nonlinear,
        hessian,
        nx,
        ng,
    };
    let mut stats = Stats::default();
    let start = Instant::now();

    // Set linearization point to initial guess.
    let mut x = x0.to_vec();

    // Lagrange multipliers of the NLP.
    let mut mu = lam0.g;
    let mut mu_x = lam0.x;

    // Initial constraint Jacobian and objective gradient.
    let (mut gk, mut jk) = ev.eval_jac_g(&x, &mut stats)?;
    let (mut fk, mut gf) = ev.eval_grad_f(&x, &mut stats)?;

    // Initialize the Hessian or Hessian approximation.
    let mut reg = 0.0;
    let mut bk = if exact_hessian {
        let (h, r) = ev.exact_hessian(&x, &mu, opt.regularize, &mut stats)?;
        reg = r;
        h
    } else {
        dense_identity(nx, 1.0)
    };

    if opt.print_header {
        info!("-------------------------------------------");
        info!("This is sqpmethod.");
        if exact_hessian {
            info!("Using exact Hessian");
        } else {
            info!("Using limited memory BFGS Hessian approximation");
        }
        info!("Number of variables:                       {:>9}", nx);
        info!("Number of constraints:                     {:>9}", ng);
        info!("Number of nonzeros in constraint Jacobian: {:>9}", jk.nnz());
        info!("Number of nonzeros in Lagrangian Hessian:  {:>9}", bk.nnz());
    }

    let mut glag = lagrangian_gradient(&gf, &jk, &mu, &mu_x)?;

    let mut dx = vec![0.0; nx];
    let mut merit_mem = MeritHistory::new(opt.merit_memory);
    let mut sigma: f64 = 0.0;

    let mut iter = 0;
    let mut ls_iter = 0;
    let mut ls_success = true;

    let status = loop {
        let pr_inf = primal_infeasibility(&x, xmin, xmax, &gk, gmin, gmax);
        let glag_norminf = norm_inf(&glag);
        let dx_norminf = norm_inf(&dx);

        let record = IterationRecord {
            iter,
            obj: fk,
            inf_pr: pr_inf,
            inf_du: glag_norminf,
            d_norm: dx_norminf,
            regularization: reg,
            sigma,
            ls_trials: ls_iter,
            ls_success,
        };
        if opt.print_iteration {
            if iter % 10 == 0 {
                log_iteration_header();
            }
            log_iteration(&record);
        }
        stats.iterations.push(record);

        if let Some(callback) = callback {
            let snapshot = IterationSnapshot {
                iter,
                f: fk,
                x: &x,
                g: &gk,
                lam_g: &mu,
                lam_x: &mu_x,
                inf_pr: pr_inf,
                inf_du: glag_norminf,
                d_norm: dx_norminf,
                ls_trials: ls_iter,
            };
            if stats.callback.measure(|| callback.update(&snapshot)) {
                info!("sqpmethod: aborted by callback...");
                break Status::UserRequestedStop;
            }
        }

        // Checking convergence criteria.
        if pr_inf < opt.tol_pr && glag_norminf < opt.tol_du {
            info!("sqpmethod: Convergence achieved after {} iterations.", iter);
            break Status::Converged;
        }
        if iter >= opt.max_iter {
            info!("sqpmethod: Maximum number of iterations reached.");
            break Status::MaxIterationsExceeded;
        }
        if iter > 0 && dx_norminf <= opt.min_step_size {
            info!(
                "sqpmethod: Search direction becomes too small without \
                convergence criteria being met."
            );
            break Status::StepTooSmall;
        }

        iter += 1;

        // Formulate and solve the QP, warm started at the previous step.
        let qp_lbx = sub(xmin, &x);
        let qp_ubx = sub(xmax, &x);
        let qp_lba = sub(gmin, &gk);
        let qp_uba = sub(gmax, &gk);
        let qp = QpProblem {
            h: &bk,
            g: &gf,
            lbx: &qp_lbx,
            ubx: &qp_ubx,
            a: &jk,
            lba: &qp_lba,
            uba: &qp_uba,
        };
        debug!("formulating QP");
        let sol = stats
            .qp
            .measure(|| qp_solver.solve(&qp, &dx))
            .map_err(|err| SqpError::QpSolve(format!("{:#}", err)))?;
        if sol.x.len() != nx || sol.lam_x.len() != nx || sol.lam_a.len() != ng {
            return Err(SqpError::QpSolve(format!(
                "solution has dimensions ({}, {}, {}), expected ({}, {}, {})",
                sol.x.len(),
                sol.lam_x.len(),
                sol.lam_a.len(),
                nx,
                nx,
                ng
            )));
        }
        dx = sol.x;
        trace!("dx = {:?}", dx);

        // Detecting indefiniteness.
        let gain = quad_form(&bk, &dx).map_err(|err| SqpError::QpSolve(format!("{:#}", err)))?;
        if gain < 0.0 {
            warn!("Indefinite Hessian detected...");
        }

        // Penalty parameter of the merit function.
        sigma = sigma
            .max(1.01 * norm_inf(&sol.lam_x))
            .max(1.01 * norm_inf(&sol.lam_a));

        // L1 merit function and its directional derivative at the actual iterate.
        let l1dir = dot(&dx, &gf) - sigma * pr_inf;
        merit_mem.push(l1_merit(fk, sigma, pr_inf));

        let ls = line_search(
            &x,
            &dx,
            l1dir,
            &merit_mem,
            opt.max_iter_ls,
            opt.c1,
            opt.beta,
            |x_cand| {
                let f_cand = ev.eval_f(x_cand, &mut stats)?;
                let g_cand = ev.eval_g(x_cand, &mut stats)?;
                let pr_inf_cand = primal_infeasibility(x_cand, xmin, xmax, &g_cand, gmin, gmax);
                Ok(l1_merit(f_cand, sigma, pr_inf_cand))
            },
        );
        ls_iter = ls.trials;
        ls_success = ls.success;
        if !ls.success {
            stats.ls_failures += 1;
        }

        // Update the dual variables, then the primal variable.
        if opt.max_iter_ls > 0 {
            mu = blend(ls.t, &sol.lam_a, &mu);
            mu_x = blend(ls.t, &sol.lam_x, &mu_x);
        } else {
            mu = sol.lam_a;
            mu_x = sol.lam_x;
        }
        let x_old = std::mem::replace(&mut x, ls.x_cand);

        // Gradient of the Lagrangian with the old x but new multipliers.
        let glag_old = if exact_hessian {
            None
        } else {
            Some(lagrangian_gradient(&gf, &jk, &mu, &mu_x)?)
        };

        (gk, jk) = ev.eval_jac_g(&x, &mut stats)?;
        (fk, gf) = ev.eval_grad_f(&x, &mut stats)?;
        glag = lagrangian_gradient(&gf, &jk, &mu, &mu_x)?;

        match glag_old {
            None => {
                let (h, r) = ev.exact_hessian(&x, &mu, opt.regularize, &mut stats)?;
                bk = h;
                reg = r;
            }
            Some(glag_old) => {
                if iter % opt.lbfgs_memory == 0 {
                    debug!("resetting BFGS approximation to its diagonal");
                    bfgs_reset(&mut bk);
                }
                bfgs_update(&mut bk, &x, &x_old, &glag, &glag_old, opt.min_curvature);
            }
        }
    };

    stats.mainloop = start.elapsed();
    stats.iter_count = iter;
    stats.return_status = Some(status);
    if opt.print_time {
        stats.log_timings();
    }

    Ok(Solution {
        x,
        f: fk,
        g: gk,
        lambda: Lambda { g: mu, x: mu_x },
        status,
        stats,
    })
}

fn check_bounds(name: &str, n: usize, lower: &[f64], upper: &[f64]) -> SqpResult<()> {
    if lower.len() != n || upper.len() != n {
        return Err(SqpError::InvalidProblem(format!(
            "bounds on {} must have length {}, got {} and {}",
            name,
            n,
            lower.len(),
            upper.len()
        )));
    }
    if let Some(i) = (0..n).find(|&i| !(lower[i] <= upper[i])) {
        return Err(SqpError::InvalidProblem(format!(
            "ill-posed bounds on {}[{}]: {} > {}",
            name, i, lower[i], upper[i]
        )));
    }
    Ok(())
}

/// `grad_f + jac_g' * mu + mu_x`
pub(crate) fn lagrangian_gradient(
    grad_f: &[f64],
    jac_g: &CSR<usize, f64>,
    mu: &[f64],
    mu_x: &[f64],
) -> SqpResult<Vec<f64>> {
    let jtmu = jac_g
        .t()
        .mat_vec(mu)
        .map_err(|err| SqpError::InvalidProblem(format!("{:#}", err)))?;
    Ok(grad_f
        .iter()
        .zip(jtmu)
        .zip(mu_x)
        .map(|((&g, jm), &m)| g + jm + m)
        .collect())
}

/// Timed access to the evaluator port.
struct Evaluator<'a> {
    f_fn: &'a dyn ObjectiveFunction,
    nonlinear: Option<&'a dyn NonlinearConstraint>,
    hessian: Option<&'a dyn LagrangianHessian>,
    nx: usize,
    ng: usize,
}

impl Evaluator<'_> {
    fn eval_f(&self, x: &[f64], stats: &mut Stats) -> Result<f64, EvaluationError> {
        let f = stats.eval_f.measure(|| self.f_fn.f(x))?;
        trace!("x = {:?}", x);
        trace!("f = {}", f);
        Ok(f)
    }

    fn eval_g(&self, x: &[f64], stats: &mut Stats) -> Result<Vec<f64>, EvaluationError> {
        let Some(nonlinear) = self.nonlinear else {
            return Ok(Vec::new());
        };
        let g = stats.eval_g.measure(|| nonlinear.g(x))?;
        if g.len() != self.ng {
            return Err(EvaluationError(format!(
                "constraint function returned {} values, expected {}",
                g.len(),
                self.ng
            )));
        }
        trace!("g = {:?}", g);
        Ok(g)
    }

    fn eval_grad_f(&self, x: &[f64], stats: &mut Stats) -> SqpResult<(f64, Vec<f64>)> {
        let (f, grad_f) = stats
            .eval_grad_f
            .measure(|| self.f_fn.grad(x))
            .map_err(|source| {
                warn!("eval_grad_f failed: {}", source);
                SqpError::Evaluation {
                    what: "eval_grad_f",
                    source,
                }
            })?;
        if grad_f.len() != self.nx {
            return Err(SqpError::InvalidProblem(format!(
                "objective gradient has length {}, expected {}",
                grad_f.len(),
                self.nx
            )));
        }
        trace!("grad_f = {:?}", grad_f);
        Ok((f, grad_f))
    }

    fn eval_jac_g(&self, x: &[f64], stats: &mut Stats) -> SqpResult<(Vec<f64>, CSR<usize, f64>)> {
        let Some(nonlinear) = self.nonlinear else {
            return Ok((Vec::new(), CSR::with_size(0, self.nx)));
        };
        let (g, jac) = stats
            .eval_jac_g
            .measure(|| nonlinear.jac(x))
            .map_err(|source| {
                warn!("eval_jac_g failed: {}", source);
                SqpError::Evaluation {
                    what: "eval_jac_g",
                    source,
                }
            })?;
        if g.len() != self.ng || jac.rows() != self.ng || jac.cols() != self.nx {
            return Err(SqpError::InvalidProblem(format!(
                "constraint Jacobian is {}x{} with {} values, expected {}x{}",
                jac.rows(),
                jac.cols(),
                g.len(),
                self.ng,
                self.nx
            )));
        }
        trace!("g = {:?}", g);
        Ok((g, jac))
    }

    /// Evaluates the Hessian of the Lagrangian on a pattern containing the
    /// diagonal and applies the optional regularization, returning the shift.
    fn exact_hessian(
        &self,
        x: &[f64],
        mu: &[f64],
        regularization: bool,
        stats: &mut Stats,
    ) -> SqpResult<(CSR<usize, f64>, f64)> {
        let Some(hessian) = self.hessian else {
            return Err(SqpError::InvalidProblem(
                "no Lagrangian Hessian given".to_string(),
            ));
        };
        let h = stats
            .eval_h
            .measure(|| hessian.hess(x, mu, 1.0))
            .map_err(|source| {
                warn!("eval_h failed: {}", source);
                SqpError::Evaluation {
                    what: "eval_h",
                    source,
                }
            })?;
        if h.rows() != self.nx || h.cols() != self.nx {
            return Err(SqpError::InvalidProblem(format!(
                "Lagrangian Hessian is {}x{}, expected {}x{}",
                h.rows(),
                h.cols(),
                self.nx,
                self.nx
            )));
        }
        let mut h = with_diagonal(&h);
        let reg = if regularization { regularize(&mut h) } else { 0.0 };
        Ok((h, reg))
    }
}
