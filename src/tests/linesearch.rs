use crate::{line_search, EvaluationError, MeritHistory};

/// `phi(x) = x^2` from `x = 1` along `dx = -4`.
fn quadratic_merit(x: &[f64]) -> Result<f64, EvaluationError> {
    Ok(x[0] * x[0])
}

fn history(values: &[f64]) -> MeritHistory {
    let mut history = MeritHistory::new(values.len().max(1));
    values.iter().for_each(|&v| history.push(v));
    history
}

#[test]
fn full_step_accepted() {
    let ls = line_search(&[1.0], &[-1.0], -2.0, &history(&[1.0]), 3, 1e-4, 0.5, quadratic_merit);

    assert_eq!(ls.t, 1.0);
    assert_eq!(ls.x_cand, vec![0.0]);
    assert_eq!(ls.trials, 1);
    assert!(ls.success);
}

#[test]
fn backtracks_until_sufficient_decrease() {
    // t = 1: x = -3, phi = 9; t = 0.5: x = -1, phi = 1 > 1 - 0.5*1e-4*8;
    // t = 0.25: x = 0, phi = 0.
    let ls = line_search(&[1.0], &[-4.0], -8.0, &history(&[1.0]), 10, 1e-4, 0.5, quadratic_merit);

    assert_eq!(ls.t, 0.25);
    assert_eq!(ls.x_cand, vec![0.0]);
    assert_eq!(ls.trials, 3);
    assert!(ls.success);
}

#[test]
fn non_monotone_acceptance() {
    // The same step is accepted against an older, larger merit value.
    let ls = line_search(&[1.0], &[-4.0], -8.0, &history(&[20.0, 1.0]), 10, 1e-4, 0.5, quadratic_merit);

    assert_eq!(ls.t, 1.0);
    assert_eq!(ls.trials, 1);
    assert!(ls.success);
}

#[test]
fn exhausted_trials_accept_last_candidate() {
    let ls = line_search(&[1.0], &[-4.0], -8.0, &history(&[1.0]), 2, 1e-4, 0.5, quadratic_merit);

    assert_eq!(ls.t, 0.5);
    assert_eq!(ls.x_cand, vec![-1.0]);
    assert_eq!(ls.trials, 2);
    assert!(!ls.success);
}

#[test]
fn failed_evaluation_is_rejected() {
    let merit = |x: &[f64]| {
        if x[0] < 0.0 {
            Err(EvaluationError::new("outside of domain"))
        } else {
            Ok(x[0])
        }
    };
    // t = 1 leaves the domain, t = 0.5 lands on x = 0.
    let ls = line_search(&[1.0], &[-2.0], -2.0, &history(&[1.0]), 5, 1e-4, 0.5, merit);

    assert!(ls.success);
    assert_eq!(ls.trials, 2);
    assert_eq!(ls.t, 0.5);
    assert_eq!(ls.x_cand, vec![0.0]);
}

#[test]
fn failed_trials_are_never_returned() {
    let merit = |x: &[f64]| {
        if x[0] < 0.0 {
            Err(EvaluationError::new("outside of domain"))
        } else {
            Ok(10.0)
        }
    };
    // t = 1 and t = 0.5 leave the domain, t = 0.25 lands on x = 0 without
    // sufficient decrease. Only then is the limit of two trials applied.
    let ls = line_search(&[1.0], &[-4.0], -8.0, &history(&[1.0]), 2, 1e-4, 0.5, merit);

    assert!(!ls.success);
    assert_eq!(ls.trials, 3);
    assert_eq!(ls.t, 0.25);
    assert_eq!(ls.x_cand, vec![0.0]);
}

#[test]
fn failed_evaluations_fall_back_to_current_point() {
    let ls = line_search(&[1.0], &[-4.0], -8.0, &history(&[1.0]), 3, 1e-4, 0.5, |_: &[f64]| {
        Err(EvaluationError::new("not a number"))
    });

    assert!(!ls.success);
    assert!(ls.trials > 3);
    assert_eq!(ls.t, 0.0);
    assert_eq!(ls.x_cand, vec![1.0]);
}

#[test]
fn disabled_line_search_takes_full_step() {
    let mut calls = 0;
    let ls = line_search(&[1.0], &[-4.0], -8.0, &history(&[1.0]), 0, 1e-4, 0.5, |x: &[f64]| {
        calls += 1;
        quadratic_merit(x)
    });

    assert_eq!(calls, 0);
    assert_eq!(ls.t, 1.0);
    assert_eq!(ls.x_cand, vec![-3.0]);
    assert_eq!(ls.trials, 0);
    assert!(ls.success);
}
