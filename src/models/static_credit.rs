//! Multi-period credit loss with Gaussian-copula obligor groups.
//!
//! Register order:
//!
//! ```text
//! markov (T+1) | z | groups | sum | adder ancillas | result | comparator ancillas
//! ```
//!
//! The objective is the comparator result, `|1⟩` when the weighted loss is at
//! most `loss`.

use tracing::info;

use crate::circuit::{Circuit, IntegerComparator, NormalDistribution, WeightedAdder};
use crate::domain::{ModelKind, StaticCreditRiskConfig};
use crate::error::AppError;
use crate::models::{
    MarkovChainPreparer, OneStepUncertainty, RegisterLayout, RiskModel, UncertaintyEncoder, step_bits,
};

#[derive(Debug, Clone)]
pub struct StaticCreditRisk {
    config: StaticCreditRiskConfig,
    encoder: UncertaintyEncoder,
    layout: RegisterLayout,
    objective: usize,
    circuit: Circuit,
}

impl StaticCreditRisk {
    pub fn new(config: StaticCreditRiskConfig) -> Result<Self, AppError> {
        config.validate()?;
        let t = config.time_steps;
        let z = config.z_qubits;
        let groups = config.groups();

        let markov = MarkovChainPreparer::new(t, config.prob_gb, config.prob_bg)?;
        let z_max = ((1u64 << z) - 1) as f64;
        let normal = NormalDistribution::new(z, z_max / 2.0, z_max / 4.0, (0.0, z_max))?;
        let good = OneStepUncertainty::fit(&config.default_probs[0], &config.sensitivities[0], z, t)?;
        let bad = OneStepUncertainty::fit(&config.default_probs[1], &config.sensitivities[1], z, t)?;
        let encoder = UncertaintyEncoder::new(t, good, bad, config.regime_wiring)?;
        let adder = WeightedAdder::new(&config.weights)?;
        let threshold = config
            .loss
            .checked_add(1)
            .ok_or_else(|| AppError::invalid("loss", format!("must be < {}", u64::MAX)))?;
        let comparator = IntegerComparator::new(adder.num_sum_qubits(), threshold, false)?;

        let mut layout = RegisterLayout::new();
        let markov_reg = layout.reserve("markov", markov.num_qubits())?;
        let z_reg = layout.reserve("z", z)?;
        let group_reg = layout.reserve("groups", groups)?;
        let sum_reg = layout.reserve("sum", adder.num_sum_qubits())?;
        let adder_anc = layout.reserve("adder_ancillas", adder.num_ancillas())?;
        let result = layout.reserve("result", 1)?;
        let cmp_anc = layout.reserve("comparator_ancillas", comparator.num_ancillas())?;

        let mut circ = Circuit::new("static_credit_risk", layout.num_qubits());
        circ.compose(&normal.circuit()?, &z_reg.indices())?;
        circ.compose(&markov.circuit()?, &markov_reg.indices())?;

        let mut qubits = Vec::with_capacity(encoder.num_qubits());
        step_bits(&markov_reg, &mut qubits);
        qubits.extend(z_reg.indices());
        qubits.extend(group_reg.indices());
        circ.compose(&encoder.circuit()?, &qubits)?;

        let adder_qubits: Vec<usize> = [group_reg, sum_reg, adder_anc]
            .iter()
            .flat_map(|r| r.indices())
            .collect();
        circ.compose(&adder.circuit()?, &adder_qubits)?;

        let cmp_qubits: Vec<usize> = [sum_reg, result, cmp_anc]
            .iter()
            .flat_map(|r| r.indices())
            .collect();
        circ.compose(&comparator.circuit()?, &cmp_qubits)?;

        let objective = result.qubit(0)?;
        info!(
            model = "StaticCreditRisk",
            qubits = circ.num_qubits(),
            objective,
            wiring = ?config.regime_wiring,
            "assembled circuit"
        );
        Ok(Self {
            config,
            encoder,
            layout,
            objective,
            circuit: circ,
        })
    }

    pub fn config(&self) -> &StaticCreditRiskConfig {
        &self.config
    }

    pub fn encoder(&self) -> &UncertaintyEncoder {
        &self.encoder
    }
}

impl RiskModel for StaticCreditRisk {
    fn kind(&self) -> ModelKind {
        ModelKind::StaticCreditRisk
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
