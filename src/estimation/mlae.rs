//! Maximum-likelihood amplitude estimation.
//!
//! Circuits apply the amplification operator `k ∈ {0, 1, 2, 4}` times after
//! the state preparation. For `p = sin²θ` the good-outcome probability of
//! circuit `k` is `sin²((2k+1)θ)`, and the estimate maximises the joint
//! binomial log-likelihood over `θ ∈ (0, π/2)`.
//!
//! The maximiser is a brute-force grid (evaluated in parallel) followed by a
//! golden-section polish between the neighbours of the best grid point.

use std::f64::consts::FRAC_PI_2;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::circuit::Circuit;
use crate::domain::Counts;
use crate::error::AppError;
use crate::estimation::EstimationProblem;
use crate::sim::Backend;

/// Amplification powers, in circuit order.
pub const POWERS: [usize; 4] = [0, 1, 2, 4];

/// Keeps the search interval away from `log(0)` at `0` and `π/2`.
const SEARCH_EPS: f64 = 1e-15;

const POLISH_ITERATIONS: usize = 60;

/// `max(10000, ⌈π/2·1000·2·max_power⌉)` grid points.
pub fn grid_size() -> usize {
    let max_power = POWERS[POWERS.len() - 1] as f64;
    10_000usize.max((FRAC_PI_2 * 1000.0 * 2.0 * max_power).ceil() as usize)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MleEstimate {
    /// `sin²θ`.
    pub estimate: f64,
    pub theta: f64,
    /// Good outcomes per power; only populated when requested.
    pub good_counts: Option<Vec<u64>>,
    /// Shots per power.
    pub total_counts: Vec<u64>,
}

/// One circuit per entry of [`POWERS`], named `qc_a_q_{k}`.
pub fn construct_mlae_circuits(
    problem: &EstimationProblem,
    measurement: bool,
) -> Result<Vec<Circuit>, AppError> {
    let a = problem.state_preparation();
    let grover = problem.grover_operator()?;
    let all: Vec<usize> = (0..a.num_qubits()).collect();

    POWERS
        .iter()
        .map(|&k| {
            let mut circ = a.clone().with_name(format!("qc_a_q_{k}"));
            if k != 0 {
                circ.compose(&grover.power(k), &all)?;
            }
            if measurement {
                circ.measure(problem.objective_qubits())?;
            }
            Ok(circ)
        })
        .collect()
}

/// `(good, total)` counts per circuit result.
pub fn good_and_total_counts(results: &[Counts], problem: &EstimationProblem) -> (Vec<u64>, Vec<u64>) {
    results
        .iter()
        .map(|counts| {
            let total = counts.values().sum::<u64>();
            let good = counts
                .iter()
                .filter(|(bits, _)| problem.is_good_state(bits))
                .map(|(_, c)| *c)
                .sum::<u64>();
            (good, total)
        })
        .unzip()
}

/// Joint log-likelihood of `theta`. Zero-count terms contribute nothing.
pub fn log_likelihood(theta: f64, good: &[u64], total: &[u64]) -> f64 {
    let mut ll = 0.0;
    for ((&k, &h), &n) in POWERS.iter().zip(good).zip(total) {
        if n == 0 {
            continue;
        }
        let angle = (2 * k + 1) as f64 * theta;
        if h > 0 {
            ll += (angle.sin().powi(2)).ln() * h as f64;
        }
        if n > h {
            ll += (angle.cos().powi(2)).ln() * (n - h) as f64;
        }
    }
    ll
}

/// Maximum-likelihood estimate from the results of [`construct_mlae_circuits`].
pub fn compute_mle(
    results: &[Counts],
    problem: &EstimationProblem,
    return_counts: bool,
) -> Result<MleEstimate, AppError> {
    if results.len() != POWERS.len() {
        return Err(AppError::invalid(
            "circuit_results",
            format!("expected {} count maps, got {}", POWERS.len(), results.len()),
        ));
    }
    let (good, total) = good_and_total_counts(results, problem);
    if total.iter().all(|&n| n == 0) {
        return Err(AppError::insufficient_data(
            "No shots recorded for any amplification power; cannot estimate the amplitude.",
        ));
    }

    let theta = maximise_likelihood(&good, &total);
    let estimate = theta.sin().powi(2);
    info!(theta, estimate, ?good, ?total, "mlae estimate");

    Ok(MleEstimate {
        estimate,
        theta,
        good_counts: return_counts.then_some(good),
        total_counts: total,
    })
}

fn maximise_likelihood(good: &[u64], total: &[u64]) -> f64 {
    let n = grid_size();
    let (lo, hi) = (SEARCH_EPS, FRAC_PI_2 - SEARCH_EPS);
    let step = (hi - lo) / (n - 1) as f64;
    let point = |i: usize| if i + 1 == n { hi } else { lo + step * i as f64 };
    let score = |theta: f64| {
        let ll = log_likelihood(theta, good, total);
        if ll.is_nan() { f64::NEG_INFINITY } else { ll }
    };

    let scores: Vec<f64> = (0..n).into_par_iter().map(|i| score(point(i))).collect();

    // Highest likelihood; ties go to the smallest grid index.
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }
    debug!(grid = n, best_index = best, theta = point(best), "grid search done");

    let left = point(best.saturating_sub(1));
    let right = point((best + 1).min(n - 1));
    let polished = golden_section_max(score, left, right);
    if score(polished) > scores[best] {
        polished
    } else {
        point(best)
    }
}

fn golden_section_max(f: impl Fn(f64) -> f64, mut a: f64, mut b: f64) -> f64 {
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let (mut fc, mut fd) = (f(c), f(d));
    for _ in 0..POLISH_ITERATIONS {
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
    }
    (a + b) / 2.0
}

/// Runs the MLAE circuits on a backend and estimates the amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaximumLikelihoodAmplitudeEstimation {
    pub shots: u64,
}

impl MaximumLikelihoodAmplitudeEstimation {
    pub fn new(shots: u64) -> Self {
        Self { shots }
    }

    pub fn estimate(&self, problem: &EstimationProblem, backend: &dyn Backend) -> Result<MleEstimate, AppError> {
        let circuits = construct_mlae_circuits(problem, true)?;
        info!(
            backend = backend.name(),
            circuits = circuits.len(),
            shots = self.shots,
            "running mlae circuits"
        );
        let results = backend.run(&circuits, self.shots)?;
        compute_mle(&results, problem, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Statevector, StatevectorSampler};

    fn rotation_problem(p: f64) -> EstimationProblem {
        let mut a = Circuit::new("A", 1);
        a.ry(2.0 * p.sqrt().asin(), 0).unwrap();
        EstimationProblem::new(a, vec![0]).unwrap()
    }

    fn counts(pairs: &[(&str, u64)]) -> Counts {
        pairs.iter().map(|(b, c)| (b.to_string(), *c)).collect()
    }

    /// Shot counts that match the exact probabilities of each circuit.
    fn ideal_results(problem: &EstimationProblem, shots: u64) -> Vec<Counts> {
        construct_mlae_circuits(problem, false)
            .unwrap()
            .iter()
            .map(|c| {
                let p1 = Statevector::from_circuit(c).unwrap().probabilities(problem.objective_qubits())[1];
                let good = (p1 * shots as f64).round() as u64;
                counts(&[("1", good), ("0", shots - good)])
            })
            .collect()
    }

    #[test]
    fn grid_size_covers_highest_power() {
        // π/2·8000 = 12566.37..., rounded up.
        assert_eq!(grid_size(), 12_567);
    }

    #[test]
    fn circuits_follow_power_schedule() {
        let problem = rotation_problem(0.3);
        let circuits = construct_mlae_circuits(&problem, true).unwrap();
        let names: Vec<&str> = circuits.iter().map(Circuit::name).collect();
        assert_eq!(names, ["qc_a_q_0", "qc_a_q_1", "qc_a_q_2", "qc_a_q_4"]);
        assert!(circuits.iter().all(|c| c.measured() == [0]));
        assert!(construct_mlae_circuits(&problem, false).unwrap()[0].measured().is_empty());
    }

    #[test]
    fn recovers_single_rotation_probability() {
        for p in [0.05, 0.3, 0.71, 0.9] {
            let problem = rotation_problem(p);
            let results = ideal_results(&problem, 1_000_000);
            let mle = compute_mle(&results, &problem, true).unwrap();
            assert!((mle.estimate - p).abs() < 1e-3, "p={p}: {}", mle.estimate);
            assert_eq!(mle.good_counts.map(|g| g.len()), Some(4));
        }
    }

    #[test]
    fn zero_shot_powers_are_skipped() {
        let problem = rotation_problem(0.25);
        let mut results = ideal_results(&problem, 100_000);
        results[2] = Counts::new();
        results[3] = Counts::new();
        let mle = compute_mle(&results, &problem, false).unwrap();
        assert!(mle.good_counts.is_none());
        assert_eq!(mle.total_counts[2], 0);
        assert!((mle.estimate - 0.25).abs() < 5e-3, "{}", mle.estimate);
    }

    #[test]
    fn all_zero_shots_is_insufficient_data() {
        let problem = rotation_problem(0.25);
        let results = vec![Counts::new(); 4];
        let err = compute_mle(&results, &problem, false).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INSUFFICIENT_DATA);
    }

    #[test]
    fn wrong_result_count_is_rejected() {
        let problem = rotation_problem(0.25);
        let err = compute_mle(&[counts(&[("1", 3)])], &problem, false).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn log_likelihood_is_finite_at_interior_zeros() {
        // sin(3θ) = 0 at θ = π/3 but no good shots were recorded for k = 1.
        let ll = log_likelihood(std::f64::consts::FRAC_PI_3, &[5, 0, 0, 0], &[10, 0, 0, 0]);
        assert!(ll.is_finite());
    }

    #[test]
    fn sampler_backend_converges() {
        let problem = rotation_problem(0.4);
        let mlae = MaximumLikelihoodAmplitudeEstimation::new(50_000);
        let mle = mlae.estimate(&problem, &StatevectorSampler::new(11)).unwrap();
        assert!((mle.estimate - 0.4).abs() < 0.01, "{}", mle.estimate);
        assert_eq!(mle.total_counts, vec![50_000; 4]);
    }
}
