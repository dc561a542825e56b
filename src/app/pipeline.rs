//! Shared run logic used by the CLI.
//!
//! config -> validated model -> exact objective distribution -> optional MLAE
//!
//! Front-ends only deal with presentation and file output.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::domain::{ModelConfig, ModelKind};
use crate::error::AppError;
use crate::estimation::{MaximumLikelihoodAmplitudeEstimation, MleEstimate};
use crate::models::{DerivativePricing, DynamicCreditRisk, PayoffSummary, QubitRange, RiskModel, StaticCreditRisk};
use crate::sim::StatevectorSampler;

/// How the objective probability is estimated on top of the exact figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimationOptions {
    pub mlae: bool,
    pub shots: u64,
    pub seed: u64,
}

impl Default for EstimationOptions {
    fn default() -> Self {
        Self {
            mlae: false,
            shots: 10_000,
            seed: 42,
        }
    }
}

/// Everything computed for one model run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub model: ModelKind,
    pub circuit_name: String,
    pub num_qubits: usize,
    pub num_instructions: usize,
    pub op_counts: BTreeMap<&'static str, usize>,
    pub registers: Vec<(&'static str, QubitRange)>,
    pub objective: usize,
    /// `[P(objective = 0), P(objective = 1)]`.
    pub exact_distribution: [f64; 2],
    pub payoff: Option<PayoffSummary>,
    pub mlae: Option<MleEstimate>,
    pub mlae_payoff: Option<f64>,
}

pub fn run_model(config: &ModelConfig, options: &EstimationOptions) -> Result<RunOutput, AppError> {
    config.validate()?;
    match config {
        ModelConfig::StaticCreditRisk(c) => summarize(&StaticCreditRisk::new(c.clone())?, options),
        ModelConfig::DynamicCreditRisk(c) => summarize(&DynamicCreditRisk::new(c.clone())?, options),
        ModelConfig::DerivativePricing(c) => summarize(&DerivativePricing::new(c.clone())?, options),
    }
}

fn summarize(model: &dyn RiskModel, options: &EstimationOptions) -> Result<RunOutput, AppError> {
    let exact_distribution = model.objective_distribution()?;
    info!(
        model = model.kind().display_name(),
        p_objective = exact_distribution[1],
        "exact objective probability"
    );

    let payoff = model.payoff_summary(exact_distribution[1]);

    let mlae = if options.mlae {
        if options.shots == 0 {
            return Err(AppError::invalid("shots", "must be > 0 when --mlae is set"));
        }
        let problem = model.estimation_problem()?;
        let backend = StatevectorSampler::new(options.seed);
        Some(MaximumLikelihoodAmplitudeEstimation::new(options.shots).estimate(&problem, &backend)?)
    } else {
        None
    };
    let mlae_payoff = mlae
        .as_ref()
        .and_then(|est| model.payoff_summary(est.estimate))
        .map(|summary| summary.expected_payoff);

    let circuit = model.circuit();
    Ok(RunOutput {
        model: model.kind(),
        circuit_name: circuit.name().to_string(),
        num_qubits: model.num_qubits(),
        num_instructions: circuit.len(),
        op_counts: circuit.count_ops(),
        registers: model.layout().registers().to_vec(),
        objective: model.objective(),
        exact_distribution,
        payoff,
        mlae,
        mlae_payoff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DerivativePricingConfig, DynamicCreditRiskConfig, StaticCreditRiskConfig};

    #[test]
    fn static_run_reports_layout_and_probability() {
        let run = run_model(
            &ModelConfig::StaticCreditRisk(StaticCreditRiskConfig::default()),
            &EstimationOptions::default(),
        )
        .unwrap();
        assert_eq!(run.model, ModelKind::StaticCreditRisk);
        assert_eq!(run.num_qubits, 14);
        assert!((run.exact_distribution[1] - 0.71001).abs() < 1e-3);
        assert!(run.payoff.is_none());
        assert!(run.mlae.is_none());
        assert_eq!(run.registers.last().map(|(n, _)| *n), Some("comparator_ancillas"));
    }

    #[test]
    fn derivative_run_carries_payoff_summary() {
        let run = run_model(
            &ModelConfig::DerivativePricing(DerivativePricingConfig::default()),
            &EstimationOptions::default(),
        )
        .unwrap();
        let payoff = run.payoff.unwrap();
        assert!((payoff.discounted_payoff - payoff.discount_factor * payoff.expected_payoff).abs() < 1e-15);
        assert!(payoff.linearization_error < 0.05);
        assert!(run.mlae_payoff.is_none());
    }

    #[test]
    fn derivative_mlae_run_reports_estimated_payoff() {
        let options = EstimationOptions {
            mlae: true,
            shots: 20_000,
            seed: 9,
        };
        let run = run_model(&ModelConfig::DerivativePricing(DerivativePricingConfig::default()), &options).unwrap();
        let mle = run.mlae.unwrap();
        assert!((mle.estimate - run.exact_distribution[1]).abs() < 0.01, "{}", mle.estimate);

        let model = DerivativePricing::new(DerivativePricingConfig::default()).unwrap();
        let expected = model.post_processing(mle.estimate);
        assert!((run.mlae_payoff.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn mlae_run_uses_sampler() {
        let options = EstimationOptions {
            mlae: true,
            shots: 20_000,
            seed: 5,
        };
        let run = run_model(&ModelConfig::DynamicCreditRisk(DynamicCreditRiskConfig::default()), &options).unwrap();
        let mle = run.mlae.unwrap();
        assert!((mle.estimate - run.exact_distribution[1]).abs() < 0.02, "{}", mle.estimate);
        assert_eq!(mle.good_counts.map(|g| g.len()), Some(4));
        assert!(run.mlae_payoff.is_none());
    }

    #[test]
    fn zero_shots_with_mlae_is_rejected() {
        let options = EstimationOptions {
            mlae: true,
            shots: 0,
            seed: 1,
        };
        let err = run_model(&ModelConfig::DynamicCreditRisk(DynamicCreditRiskConfig::default()), &options)
            .unwrap_err();
        assert!(err.message().contains("shots"));
    }
}
