//! Circuit builders for the regime-switching risk models.
//!
//! Components (`markov`, `uncertainty`, `growth`, `lattice`) are pure
//! constructors returning [`Circuit`] values. The assembled variants lay them
//! out with a [`RegisterLayout`] and publish the objective qubit.

pub mod derivative;
pub mod dynamic_credit;
pub mod growth;
pub mod lattice;
pub mod layout;
pub mod markov;
pub mod static_credit;
pub mod uncertainty;

pub use derivative::*;
pub use dynamic_credit::*;
pub use growth::*;
pub use lattice::*;
pub use layout::*;
pub use markov::*;
pub use static_credit::*;
pub use uncertainty::*;

use crate::circuit::Circuit;
use crate::domain::ModelKind;
use crate::error::AppError;
use crate::estimation::EstimationProblem;
use crate::sim::Statevector;

/// Common surface of the assembled circuits.
pub trait RiskModel {
    fn kind(&self) -> ModelKind;

    fn circuit(&self) -> &Circuit;

    fn layout(&self) -> &RegisterLayout;

    /// Qubit whose `|1⟩` probability is the quantity of interest.
    fn objective(&self) -> usize;

    fn num_qubits(&self) -> usize {
        self.circuit().num_qubits()
    }

    /// Payoff figures implied by `P(objective = 1)`; `None` for models without a payoff.
    fn payoff_summary(&self, _probability: f64) -> Option<PayoffSummary> {
        None
    }

    fn estimation_problem(&self) -> Result<EstimationProblem, AppError> {
        EstimationProblem::new(self.circuit().clone(), vec![self.objective()])
    }

    /// `[P(objective = 0), P(objective = 1)]` from the exact state.
    fn objective_distribution(&self) -> Result<[f64; 2], AppError> {
        let probs = Statevector::from_circuit(self.circuit())?.probabilities(&[self.objective()]);
        Ok([probs[0], probs[1]])
    }
}

/// Appends `regime[1..=T]`, i.e. the step bits without the stationary prior.
fn step_bits(markov: &QubitRange, qubits: &mut Vec<usize>) {
    qubits.extend(markov.start + 1..markov.end());
}
