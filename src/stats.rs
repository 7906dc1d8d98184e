use std::time::{Duration, Instant};

use log::info;

use crate::common::Status;

/// Cumulative time and number of calls of one phase of the solver.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timing {
    pub time: Duration,
    pub calls: usize,
}

impl Timing {
    /// Runs `f`, adding its wall-clock time and one call.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.time += start.elapsed();
        self.calls += 1;
        out
    }

    fn average_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.time.as_secs_f64() * 1000.0 / self.calls as f64
        }
    }
}

/// Values printed for one iterate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationRecord {
    pub iter: usize,
    pub obj: f64,
    pub inf_pr: f64,
    pub inf_du: f64,
    pub d_norm: f64,
    pub regularization: f64,
    /// L1 merit penalty in effect when this iterate was reached.
    pub sigma: f64,
    pub ls_trials: usize,
    pub ls_success: bool,
}

/// Solver statistics.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub eval_f: Timing,
    pub eval_grad_f: Timing,
    pub eval_g: Timing,
    pub eval_jac_g: Timing,
    pub eval_h: Timing,
    pub qp: Timing,
    pub callback: Timing,
    pub mainloop: Duration,

    /// Number of SQP iterations.
    pub iter_count: usize,
    pub return_status: Option<Status>,
    /// Iterations on which the line search hit `max_iter_ls`.
    pub ls_failures: usize,
    pub iterations: Vec<IterationRecord>,
}

impl Stats {
    pub(crate) fn log_timings(&self) {
        let phases = [
            ("eval_f", &self.eval_f),
            ("eval_grad_f", &self.eval_grad_f),
            ("eval_g", &self.eval_g),
            ("eval_jac_g", &self.eval_jac_g),
            ("eval_h", &self.eval_h),
            ("qp", &self.qp),
        ];
        for (name, timing) in phases {
            if timing.calls > 0 {
                info!(
                    "time spent in {}: {:.6} s. ({} calls, {:.4} ms. average)",
                    name,
                    timing.time.as_secs_f64(),
                    timing.calls,
                    timing.average_ms()
                );
            } else {
                info!("time spent in {}: {:.6} s.", name, timing.time.as_secs_f64());
            }
        }
        info!(
            "time spent in main loop: {:.6} s.",
            self.mainloop.as_secs_f64()
        );
        info!(
            "time spent in callback function: {:.6} s.",
            self.callback.time.as_secs_f64()
        );
    }
}

pub(crate) fn log_iteration_header() {
    info!(
        "{:>4}{:>15}{:>10}{:>10}{:>10}{:>7}{:>3} ",
        "iter", "objective", "inf_pr", "inf_du", "||d||", "lg(rg)", "ls"
    );
}

pub(crate) fn log_iteration(rec: &IterationRecord) {
    let rg = if rec.regularization > 0.0 {
        format!("{:.2}", rec.regularization.log10())
    } else {
        "-".to_string()
    };
    info!(
        "{:>4}{:>15.6e}{:>10.2e}{:>10.2e}{:>10.2e}{:>7}{:>3}{}",
        rec.iter,
        rec.obj,
        rec.inf_pr,
        rec.inf_du,
        rec.d_norm,
        rg,
        rec.ls_trials,
        if rec.ls_success { ' ' } else { 'F' }
    );
}
