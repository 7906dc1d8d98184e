use log::debug;

use crate::error::EvaluationError;
use crate::merit::MeritHistory;

/// Result of a line search along the QP step.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSearch {
    /// Accepted step length in `[0, 1]`.
    pub t: f64,
    /// Accepted point `x + t*dx`.
    pub x_cand: Vec<f64>,
    /// Number of trial points.
    pub trials: usize,
    /// False if the trial limit was reached without sufficient decrease.
    pub success: bool,
}

/// Backtracking line search on the L1 merit function with non-monotone
/// Armijo acceptance against the largest value in `history`.
///
/// `merit` evaluates the merit function at a trial point. A trial whose
/// evaluation fails is never returned: the step is shortened and the search
/// goes on regardless of `max_iter_ls`, ending at `x` itself (`t == 0`) if
/// no shorter step can be evaluated. Failed trials still count towards
/// `trials`. When `max_iter_ls` trials are exhausted the last evaluated
/// trial is returned with `success == false`. A `max_iter_ls` of zero takes
/// the full step.
pub fn line_search<M>(
    x: &[f64],
    dx: &[f64],
    l1dir: f64,
    history: &MeritHistory,
    max_iter_ls: usize,
    c1: f64,
    beta: f64,
    mut merit: M,
) -> LineSearch
where
    M: FnMut(&[f64]) -> Result<f64, EvaluationError>,
{
    let step = |t: f64| -> Vec<f64> { x.iter().zip(dx).map(|(&xi, &di)| xi + t * di).collect() };

    if max_iter_ls == 0 {
        return LineSearch {
            t: 1.0,
            x_cand: step(1.0),
            trials: 0,
            success: true,
        };
    }

    let merit_max = history.max().unwrap_or(f64::INFINITY);
    let mut t = 1.0;
    let mut trials = 0;
    loop {
        let x_cand = step(t);
        trials += 1;

        match merit(&x_cand) {
            Ok(m) => {
                if m <= merit_max + t * c1 * l1dir {
                    debug!("line-search completed, candidate accepted (t = {})", t);
                    return LineSearch {
                        t,
                        x_cand,
                        trials,
                        success: true,
                    };
                }
            }
            Err(err) => {
                debug!("line-search trial {} rejected: {}", trials, err);
                if x_cand == x || t < f64::MIN_POSITIVE {
                    debug!("line-search failed, no trial point could be evaluated");
                    return LineSearch {
                        t: 0.0,
                        x_cand: x.to_vec(),
                        trials,
                        success: false,
                    };
                }
                t *= beta;
                continue;
            }
        }

        if trials >= max_iter_ls {
            debug!("line-search completed, maximum number of iterations");
            return LineSearch {
                t,
                x_cand,
                trials,
                success: false,
            };
        }

        t *= beta;
    }
}
