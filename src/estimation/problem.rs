use std::fmt;
use std::sync::Arc;

use crate::circuit::{Circuit, Control, Instruction, Operation};
use crate::error::AppError;

/// Classifies a measured bitstring (first objective qubit rightmost).
pub type GoodStatePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Everything amplitude estimation needs to know about a circuit.
#[derive(Clone)]
pub struct EstimationProblem {
    state_preparation: Circuit,
    objective_qubits: Vec<usize>,
    grover_operator: Option<Circuit>,
    is_good_state: GoodStatePredicate,
}

impl EstimationProblem {
    /// Problem whose good states have every objective qubit at `|1⟩`.
    pub fn new(state_preparation: Circuit, objective_qubits: Vec<usize>) -> Result<Self, AppError> {
        if objective_qubits.is_empty() {
            return Err(AppError::invalid("objective_qubits", "must name at least one qubit"));
        }
        let n = state_preparation.num_qubits();
        for (i, &q) in objective_qubits.iter().enumerate() {
            if q >= n {
                return Err(AppError::layout(format!(
                    "Objective qubit {q} is outside '{}' ({n} qubits).",
                    state_preparation.name()
                )));
            }
            if objective_qubits[..i].contains(&q) {
                return Err(AppError::layout(format!(
                    "Overlapping register: objective qubit {q} is listed twice."
                )));
            }
        }
        Ok(Self {
            state_preparation,
            objective_qubits,
            grover_operator: None,
            is_good_state: Arc::new(|bits: &str| bits.chars().all(|c| c == '1')),
        })
    }

    pub fn with_good_state(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.is_good_state = Arc::new(predicate);
        self
    }

    /// Replace the default amplification operator.
    pub fn with_grover_operator(mut self, grover: Circuit) -> Result<Self, AppError> {
        if grover.num_qubits() != self.state_preparation.num_qubits() {
            return Err(AppError::layout(format!(
                "Grover operator has {} qubits but the state preparation has {}.",
                grover.num_qubits(),
                self.state_preparation.num_qubits()
            )));
        }
        self.grover_operator = Some(grover);
        Ok(self)
    }

    pub fn state_preparation(&self) -> &Circuit {
        &self.state_preparation
    }

    pub fn objective_qubits(&self) -> &[usize] {
        &self.objective_qubits
    }

    pub fn is_good_state(&self, bitstring: &str) -> bool {
        (self.is_good_state)(bitstring)
    }

    /// `Q = A · S0 · A† · S_χ`, with `S_χ` flipping the sign of good states.
    ///
    /// The default oracle is a `Z` on the last objective qubit controlled by
    /// the remaining objective qubits being `|1⟩`.
    pub fn grover_operator(&self) -> Result<Circuit, AppError> {
        if let Some(grover) = &self.grover_operator {
            return Ok(grover.clone());
        }
        let a = &self.state_preparation;
        let n = a.num_qubits();
        let mut q = Circuit::new("Q", n);

        let (&last, rest) = self
            .objective_qubits
            .split_last()
            .ok_or_else(|| AppError::invalid("objective_qubits", "must name at least one qubit"))?;
        let controls = rest.iter().map(|&c| Control::on(c)).collect();
        q.push(Instruction::controlled(Operation::Z { target: last }, controls))?;

        let all: Vec<usize> = (0..n).collect();
        q.compose(&a.inverse(), &all)?;
        q.apply(Operation::ReflectZero { qubits: all.clone() })?;
        q.compose(a, &all)?;
        Ok(q)
    }
}

impl fmt::Debug for EstimationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimationProblem")
            .field("state_preparation", &self.state_preparation.name())
            .field("num_qubits", &self.state_preparation.num_qubits())
            .field("objective_qubits", &self.objective_qubits)
            .field("custom_grover", &self.grover_operator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Statevector;

    fn rotation(theta: f64) -> Circuit {
        let mut a = Circuit::new("A", 1);
        a.ry(2.0 * theta, 0).unwrap();
        a
    }

    #[test]
    fn default_predicate_requires_all_ones() {
        let problem = EstimationProblem::new(Circuit::new("A", 3), vec![0, 2]).unwrap();
        assert!(problem.is_good_state("11"));
        assert!(!problem.is_good_state("10"));
        let custom = problem.with_good_state(|bits| bits.ends_with('1'));
        assert!(custom.is_good_state("01"));
    }

    #[test]
    fn objective_qubits_are_checked() {
        assert!(EstimationProblem::new(Circuit::new("A", 2), vec![]).is_err());
        let err = EstimationProblem::new(Circuit::new("A", 2), vec![2]).unwrap_err();
        assert!(err.message().contains("outside"));
        let err = EstimationProblem::new(Circuit::new("A", 2), vec![1, 1]).unwrap_err();
        assert!(err.message().contains("Overlapping"));
    }

    #[test]
    fn grover_power_rotates_by_odd_multiples() {
        let theta = 0.3;
        let problem = EstimationProblem::new(rotation(theta), vec![0]).unwrap();
        let q = problem.grover_operator().unwrap();
        for k in [1usize, 2, 4] {
            let mut circ = problem.state_preparation().clone();
            circ.compose(&q.power(k), &[0]).unwrap();
            let p = Statevector::from_circuit(&circ).unwrap().probabilities(&[0])[1];
            let expected = ((2 * k + 1) as f64 * theta).sin().powi(2);
            assert!((p - expected).abs() < 1e-12, "k={k}: {p} vs {expected}");
        }
    }

    #[test]
    fn custom_grover_operator_drives_the_amplified_circuits() {
        let theta = 0.3;
        let problem = EstimationProblem::new(rotation(theta), vec![0]).unwrap();
        let default_circuits = crate::estimation::construct_mlae_circuits(&problem, false).unwrap();

        // An identity operator leaves every power at the prepared amplitude.
        let identity = problem.clone().with_grover_operator(Circuit::new("I", 1)).unwrap();
        let circuits = crate::estimation::construct_mlae_circuits(&identity, false).unwrap();
        assert_eq!(circuits.len(), default_circuits.len());
        for (custom, default) in circuits.iter().zip(&default_circuits).skip(1) {
            assert_eq!(custom.len(), identity.state_preparation().len());
            assert!(default.len() > custom.len());
            let p = Statevector::from_circuit(custom).unwrap().probabilities(&[0])[1];
            assert!((p - theta.sin().powi(2)).abs() < 1e-12, "{}: {p}", custom.name());
        }

        let err = problem.with_grover_operator(Circuit::new("Q", 2)).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_LAYOUT);
    }

    #[test]
    fn grover_with_two_objective_qubits() {
        // Good state |11⟩ has probability sin²θ.
        let theta: f64 = 0.2;
        let mut a = Circuit::new("A", 2);
        a.ry(2.0 * theta, 0).unwrap();
        a.cry(std::f64::consts::PI, 0, 1).unwrap();
        let problem = EstimationProblem::new(a, vec![0, 1]).unwrap();
        let mut circ = problem.state_preparation().clone();
        circ.compose(&problem.grover_operator().unwrap(), &[0, 1]).unwrap();
        let p = Statevector::from_circuit(&circ).unwrap().probabilities(&[0, 1])[0b11];
        assert!((p - (3.0 * theta).sin().powi(2)).abs() < 1e-12);
    }
}
