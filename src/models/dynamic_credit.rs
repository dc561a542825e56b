//! Portfolio growth accumulated per regime, compared against a loss level.
//!
//! Register order: `markov (T+1) | sum`. The sum register starts in the
//! Fourier basis (Hadamards on `|0⟩`), collects the regime increments, has the
//! shifted loss subtracted and is transformed back. Its top qubit is the
//! objective: it reads `|1⟩` when the accumulated growth ends below the loss.

use tracing::info;

use crate::circuit::{Circuit, phase_adder, qft};
use crate::domain::{DynamicCreditRiskConfig, ModelKind};
use crate::error::AppError;
use crate::models::{GrowthEncoder, MarkovChainPreparer, RegisterLayout, RiskModel, step_bits};

#[derive(Debug, Clone)]
pub struct DynamicCreditRisk {
    config: DynamicCreditRiskConfig,
    encoder: GrowthEncoder,
    scaled_loss: f64,
    layout: RegisterLayout,
    objective: usize,
    circuit: Circuit,
}

impl DynamicCreditRisk {
    pub fn new(config: DynamicCreditRiskConfig) -> Result<Self, AppError> {
        config.validate()?;
        let t = config.time_steps;
        let fp = config.fractional_precision;

        let markov = MarkovChainPreparer::new(t, config.prob_gb, config.prob_bg)?;
        let encoder = GrowthEncoder::new(t, config.growth_possibilities, fp)?;
        let n = encoder.num_sum_qubits();
        // Half a precision step of the smallest increment keeps exact ties on one side.
        let scaled_loss = config.loss as f64 + 2f64.powi(-(fp as i32) - 1) * encoder.smallest_increment();

        let mut layout = RegisterLayout::new();
        let markov_reg = layout.reserve("markov", markov.num_qubits())?;
        let sum_reg = layout.reserve("sum", n)?;
        let sum = sum_reg.indices();

        let mut circ = Circuit::new(format!("{}_loss_{t}_steps", config.loss), layout.num_qubits());
        circ.compose(&markov.circuit()?, &markov_reg.indices())?;
        for &q in &sum {
            circ.h(q)?;
        }

        let mut qubits = Vec::with_capacity(encoder.num_qubits());
        step_bits(&markov_reg, &mut qubits);
        qubits.extend(&sum);
        circ.compose(&encoder.circuit()?, &qubits)?;

        circ.compose(&phase_adder(n, -scaled_loss, fp)?, &sum)?;
        circ.compose(&qft(n, true)?, &sum)?;

        let objective = sum_reg.last()?;
        info!(
            model = "DynamicCreditRisk",
            qubits = circ.num_qubits(),
            objective,
            sum_qubits = n,
            scaled_loss,
            "assembled circuit"
        );
        Ok(Self {
            config,
            encoder,
            scaled_loss,
            layout,
            objective,
            circuit: circ,
        })
    }

    pub fn config(&self) -> &DynamicCreditRiskConfig {
        &self.config
    }

    pub fn encoder(&self) -> &GrowthEncoder {
        &self.encoder
    }

    pub fn num_sum_qubits(&self) -> usize {
        self.encoder.num_sum_qubits()
    }

    /// Loss threshold after the half-step tie shift.
    pub fn scaled_loss(&self) -> f64 {
        self.scaled_loss
    }
}

impl RiskModel for DynamicCreditRisk {
    fn kind(&self) -> ModelKind {
        ModelKind::DynamicCreditRisk
    }

    fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    fn objective(&self) -> usize {
        self.objective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PGB: f64 = 0.009708737864077669;
    const PBG: f64 = 0.1111111111111111;

    fn config(loss: i64, time_steps: usize, probs: (f64, f64), growth: [f64; 2], fp: u32) -> DynamicCreditRiskConfig {
        DynamicCreditRiskConfig {
            loss,
            time_steps,
            prob_gb: probs.0,
            prob_bg: probs.1,
            growth_possibilities: growth,
            fractional_precision: fp,
        }
    }

    #[test]
    fn reference_table() {
        let cases = [
            (config(1, 3, (PGB, PBG), [0.771, 0.0], 2), 0.08004389),
            (config(1, 4, (PGB, PBG), [0.771, 0.0], 2), 0.06895287),
            (config(1, 3, (0.1, 0.3), [0.771, 0.0], 2), 0.22838713),
            (config(1, 3, (PGB, PBG), [1.2, 0.0], 2), 0.06640405),
            (config(1, 3, (PGB, PBG), [0.771, 0.0], 4), 0.08309769),
        ];
        for (config, expected) in cases {
            let model = DynamicCreditRisk::new(config.clone()).unwrap();
            let dist = model.objective_distribution().unwrap();
            assert!((dist[1] - expected).abs() < 1e-4, "{config:?}: {dist:?} vs {expected}");
            assert!((dist[0] + dist[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn defaults_match_reference_row() {
        let model = DynamicCreditRisk::new(DynamicCreditRiskConfig::default()).unwrap();
        assert_eq!(model.circuit().name(), "1_loss_3_steps");
        assert_eq!(model.num_sum_qubits(), 6);
        assert_eq!(model.num_qubits(), 4 + 6);
        assert_eq!(model.objective(), model.num_qubits() - 1);
        assert!((model.scaled_loss() - (1.0 + 0.125 * 0.771)).abs() < 1e-12);
    }

    #[test]
    fn widest_accepted_precision_runs() {
        let model = DynamicCreditRisk::new(config(1, 3, (PGB, PBG), [0.771, 0.0], 8)).unwrap();
        assert_eq!(model.num_sum_qubits(), crate::domain::MAX_ARITHMETIC_QUBITS);
        let dist = model.objective_distribution().unwrap();
        assert!((dist[1] - 0.07958939).abs() < 1e-4, "{dist:?}");
        assert!((dist[0] + dist[1] - 1.0).abs() < 1e-9);

        let err = DynamicCreditRisk::new(config(1, 3, (PGB, PBG), [0.771, 0.0], 9)).unwrap_err();
        assert!(err.is_validation());
        assert!(err.message().contains("limit is 12"), "{err}");
    }

    #[test]
    fn all_zero_growth_fails_validation() {
        let err = DynamicCreditRisk::new(config(1, 3, (PGB, PBG), [0.0, 0.0], 2)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn too_narrow_register_is_a_layout_error() {
        let err = DynamicCreditRisk::new(config(0, 1, (PGB, PBG), [0.01, 0.0], 0)).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_LAYOUT);
    }
}
