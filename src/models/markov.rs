//! Two-state Markov chain loaded into a register of regime bits.

use crate::circuit::Circuit;
use crate::domain::{ProbabilityPair, RotationAngles};
use crate::error::AppError;

/// Prepares `time_steps + 1` regime qubits.
///
/// Qubit 0 carries the stationary prior; qubit `i + 1` depends on qubit `i`
/// through a controlled rotation. `|1⟩` is the bad regime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkovChainPreparer {
    time_steps: usize,
    probabilities: ProbabilityPair,
}

impl MarkovChainPreparer {
    pub fn new(time_steps: usize, prob_gb: f64, prob_bg: f64) -> Result<Self, AppError> {
        if time_steps == 0 {
            return Err(AppError::invalid("time_steps", "must be >= 1"));
        }
        Ok(Self {
            time_steps,
            probabilities: ProbabilityPair::new(prob_gb, prob_bg)?,
        })
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn num_qubits(&self) -> usize {
        self.time_steps + 1
    }

    pub fn angles(&self) -> RotationAngles {
        self.probabilities.angles()
    }

    /// Exact `P(regime_i = bad)` for every qubit of the register.
    pub fn marginals(&self) -> Vec<f64> {
        let ProbabilityPair { prob_gb, prob_bg } = self.probabilities;
        let mut out = Vec::with_capacity(self.num_qubits());
        let mut bad = self.probabilities.stationary_bad();
        out.push(bad);
        for _ in 0..self.time_steps {
            bad = bad * (1.0 - prob_bg) + (1.0 - bad) * prob_gb;
            out.push(bad);
        }
        out
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let angles = self.angles();
        let mut circ = Circuit::new("MC", self.num_qubits());
        circ.ry(angles.theta_naught, 0)?;
        for i in 0..self.time_steps {
            circ.ry(angles.theta0, i + 1)?;
            circ.cry(angles.theta1 - angles.theta0, i, i + 1)?;
        }
        Ok(circ)
    }
}
