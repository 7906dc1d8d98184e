use log::{debug, warn};
use sparsetools::csr::CSR;

use crate::math::{dot, sub};
use crate::sparse::{add_to_diagonal, clear_off_diagonal, rank_one_update, row};

/// Outcome of a BFGS update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BfgsUpdate {
    /// The approximation was updated. `omega` is the Powell damping factor
    /// (1 when undamped).
    Applied { omega: f64 },
    /// `s'y` or `s'Bs` was below the curvature threshold or not finite,
    /// `b` is unchanged.
    Skipped,
}

/// Damped BFGS update of `b` from the step `x - x_old` and the change in
/// the Lagrangian gradient `glag - glag_old`.
///
/// Powell damping replaces `y` by `omega*y + (1-omega)*B*s` whenever
/// `s'y < 0.2*s'Bs`, keeping the update positive definite. The update is
/// skipped if either denominator has magnitude at most `min_curvature`
/// or is not finite.
pub fn bfgs_update(
    b: &mut CSR<usize, f64>,
    x: &[f64],
    x_old: &[f64],
    glag: &[f64],
    glag_old: &[f64],
    min_curvature: f64,
) -> BfgsUpdate {
    let sk = sub(x, x_old);
    let mut yk = sub(glag, glag_old);
    let qk = match b.mat_vec(&sk) {
        Ok(qk) => qk,
        Err(err) => {
            warn!("skipping BFGS update: {}", err);
            return BfgsUpdate::Skipped;
        }
    };

    let s_bs = dot(&sk, &qk);
    let s_y = dot(&sk, &yk);

    let omega = if s_y < 0.2 * s_bs {
        0.8 * s_bs / (s_bs - s_y)
    } else {
        1.0
    };
    if omega != 1.0 {
        yk.iter_mut()
            .zip(&qk)
            .for_each(|(y, &q)| *y = omega * *y + (1.0 - omega) * q);
    }

    let s_y = dot(&sk, &yk);
    if s_y.abs() <= min_curvature
        || s_bs.abs() <= min_curvature
        || !s_y.is_finite()
        || !s_bs.is_finite()
    {
        debug!("skipping BFGS update: s'y = {:e}, s'Bs = {:e}", s_y, s_bs);
        return BfgsUpdate::Skipped;
    }
    let theta = 1.0 / s_y;
    let phi = 1.0 / s_bs;

    rank_one_update(b, theta, &yk, &yk);
    rank_one_update(b, -phi, &qk, &qk);

    BfgsUpdate::Applied { omega }
}

/// Drops all off-diagonal entries of the approximation.
pub fn bfgs_reset(b: &mut CSR<usize, f64>) {
    clear_off_diagonal(b);
}

/// Regularization parameter from the Gershgorin circle theorem: the
/// smallest diagonal shift that makes every row bound
/// `H[i,i] - sum_{j!=i} |H[i,j]|` non-negative. Zero if none is needed.
pub fn gershgorin_regularization(h: &CSR<usize, f64>) -> f64 {
    let min_bound = (0..h.rows())
        .map(|i| {
            row(h, i)
                .map(|(j, v)| if i == j { v } else { -v.abs() })
                .sum::<f64>()
        })
        .fold(0.0, f64::min);
    -min_bound
}

/// Shifts the diagonal of `h` by the Gershgorin regularization parameter.
/// Returns the applied shift. `h` must store its full diagonal.
pub fn regularize(h: &mut CSR<usize, f64>) -> f64 {
    let reg = gershgorin_regularization(h);
    if reg > 0.0 {
        add_to_diagonal(h, reg);
    }
    reg
}
