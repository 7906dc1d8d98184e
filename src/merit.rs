use std::collections::VecDeque;

/// Linf-norm of the primal infeasibility of `x` and `g` with respect to
/// their bounds. Zero for a feasible point.
pub fn primal_infeasibility(
    x: &[f64],
    xmin: &[f64],
    xmax: &[f64],
    g: &[f64],
    gmin: &[f64],
    gmax: &[f64],
) -> f64 {
    let bounds = x
        .iter()
        .zip(xmin.iter().zip(xmax))
        .map(|(&xj, (&lo, &hi))| (lo - xj).max(xj - hi));
    let nonlinear = g
        .iter()
        .zip(gmin.iter().zip(gmax))
        .map(|(&gj, (&lo, &hi))| (lo - gj).max(gj - hi));
    bounds.chain(nonlinear).fold(0.0, f64::max)
}

/// Bounded FIFO of the most recent L1 merit values, for non-monotone
/// acceptance in the line search.
#[derive(Clone, Debug)]
pub struct MeritHistory {
    capacity: usize,
    values: VecDeque<f64>,
}

impl MeritHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends `merit`, evicting the oldest value when over capacity.
    pub fn push(&mut self, merit: f64) {
        self.values.push_back(merit);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Largest stored value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

/// L1 merit `f + sigma * pr_inf`.
pub fn l1_merit(f: f64, sigma: f64, pr_inf: f64) -> f64 {
    f + sigma * pr_inf
}
