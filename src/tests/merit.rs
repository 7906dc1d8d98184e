use crate::{l1_merit, primal_infeasibility, MeritHistory};

const INF: f64 = f64::INFINITY;

#[test]
fn feasible_point_has_zero_infeasibility() {
    let pr_inf = primal_infeasibility(
        &[0.5, 1.0],
        &[0.0, -INF],
        &[1.0, INF],
        &[2.0],
        &[2.0],
        &[2.0],
    );
    assert_eq!(pr_inf, 0.0);

    assert_eq!(primal_infeasibility(&[], &[], &[], &[], &[], &[]), 0.0);
}

#[test]
fn largest_violation_wins() {
    // x[0] below its bound by 3, g[0] above its bound by 0.5.
    let pr_inf = primal_infeasibility(
        &[-3.0, 0.0],
        &[0.0, 0.0],
        &[1.0, 1.0],
        &[2.5],
        &[-INF],
        &[2.0],
    );
    assert_eq!(pr_inf, 3.0);

    let pr_inf = primal_infeasibility(&[0.0], &[0.0], &[0.0], &[1.0, 7.0], &[0.0, 0.0], &[1.0, 1.0]);
    assert_eq!(pr_inf, 6.0);
}

#[test]
fn history_evicts_oldest() {
    let mut history = MeritHistory::new(3);
    assert!(history.is_empty());
    assert_eq!(history.max(), None);

    for merit in [10.0, 2.0, 3.0] {
        history.push(merit);
    }
    assert_eq!(history.len(), 3);
    assert_eq!(history.max(), Some(10.0));

    history.push(1.0);
    assert_eq!(history.len(), 3);
    assert_eq!(history.max(), Some(3.0));
    assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 1.0]);

    history.clear();
    assert!(history.is_empty());
}

#[test]
fn merit_is_penalized_objective() {
    assert_eq!(l1_merit(1.5, 2.0, 0.25), 2.0);
    assert_eq!(l1_merit(-1.0, 0.0, 5.0), -1.0);
}
