//! Derivative pricing on a regime-switching binomial lattice.
//!
//! Register order:
//!
//! ```text
//! markov (T+1) | branch (T) | price (ip+fp+1) | payoff target | payoff ancillas
//! ```
//!
//! The price register evolves in log space inside the Fourier basis and is
//! converted back with `e^x ≈ 1 + x` before the payoff is applied. The
//! linearisation error grows quickly with `sigma·√time_tot`; it is reported by
//! [`DerivativePricing::linearization_error`] and logged when it exceeds the
//! configured tolerance.

use serde::Serialize;
use tracing::{info, warn};

use crate::circuit::{Circuit, LinearAmplitudeFunction, phase_adder, qft};
use crate::domain::{DerivativePricingConfig, ModelKind};
use crate::error::AppError;
use crate::models::{
    LatticeParams, MarkovChainPreparer, PriceLatticeEvolver, RegisterLayout, RiskModel, step_bits,
};

/// Payoff figures reported alongside the objective probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayoffSummary {
    pub expected_payoff: f64,
    pub discount_factor: f64,
    pub discounted_payoff: f64,
    pub linearization_error: f64,
}

#[derive(Debug, Clone)]
pub struct DerivativePricing {
    config: DerivativePricingConfig,
    evolver: PriceLatticeEvolver,
    payoff: LinearAmplitudeFunction,
    layout: RegisterLayout,
    objective: usize,
    circuit: Circuit,
}

impl DerivativePricing {
    pub fn new(config: DerivativePricingConfig) -> Result<Self, AppError> {
        config.validate()?;
        let t = config.time_steps;
        let fp = config.fractional_precision;
        let n = config.num_price_qubits();

        let markov = MarkovChainPreparer::new(t, config.prob_gb, config.prob_bg)?;
        let params = LatticeParams {
            time_steps: t,
            time_tot: config.time_tot,
            base_volatility: config.base_volatility,
            regime_rate: config.regime_rate,
        };
        let evolver = PriceLatticeEvolver::new(params, n, fp)?;
        let payoff = payoff_function(&config)?;

        let mut layout = RegisterLayout::new();
        let markov_reg = layout.reserve("markov", markov.num_qubits())?;
        let branch_reg = layout.reserve("branch", t)?;
        let price_reg = layout.reserve("price", n)?;
        let target = layout.reserve("payoff_target", 1)?;
        let payoff_anc = layout.reserve("payoff_ancillas", payoff.num_ancillas())?;
        let price = price_reg.indices();

        let mut circ = Circuit::new("DP", layout.num_qubits());
        circ.compose(&markov.circuit()?, &markov_reg.indices())?;
        for q in branch_reg.indices() {
            circ.h(q)?;
        }
        circ.compose(&qft(n, false)?, &price)?;
        circ.compose(&phase_adder(n, config.starting_price.ln(), fp)?, &price)?;

        let mut qubits = Vec::with_capacity(evolver.num_qubits());
        step_bits(&markov_reg, &mut qubits);
        qubits.extend(branch_reg.indices());
        qubits.extend(&price);
        circ.compose(&evolver.circuit()?, &qubits)?;

        // log price -> price via e^x ≈ 1 + x
        circ.compose(&phase_adder(n, 1.0, fp)?, &price)?;
        circ.compose(&qft(n, true)?, &price)?;

        let payoff_qubits: Vec<usize> = [price_reg, target, payoff_anc]
            .iter()
            .flat_map(|r| r.indices())
            .collect();
        circ.compose(&payoff.circuit()?, &payoff_qubits)?;

        let objective = target.qubit(0)?;
        let model = Self {
            config,
            evolver,
            payoff,
            layout,
            objective,
            circuit: circ,
        };

        let error = model.linearization_error();
        if error > model.config.linearization_tolerance {
            warn!(
                error,
                tolerance = model.config.linearization_tolerance,
                time_tot = model.config.time_tot,
                "log-price linearisation e^x ≈ 1 + x exceeds tolerance"
            );
        }
        info!(
            model = "DerivativePricing",
            qubits = model.circuit.num_qubits(),
            objective,
            price_qubits = n,
            linearization_error = error,
            "assembled circuit"
        );
        Ok(model)
    }

    pub fn config(&self) -> &DerivativePricingConfig {
        &self.config
    }

    pub fn evolver(&self) -> &PriceLatticeEvolver {
        &self.evolver
    }

    pub fn payoff(&self) -> &LinearAmplitudeFunction {
        &self.payoff
    }

    /// Map `P(objective = 1)` to an (undiscounted) expected payoff.
    pub fn post_processing(&self, scaled_value: f64) -> f64 {
        self.payoff.post_processing(scaled_value)
    }

    pub fn discount_factor(&self) -> f64 {
        (-self.config.r * self.config.time_tot).exp()
    }

    /// `e^x − (1 + x)` at the worst-case log excursion of the lattice.
    pub fn linearization_error(&self) -> f64 {
        let x = self.evolver.params().max_log_excursion();
        x.exp() - 1.0 - x
    }
}

impl RiskModel for DerivativePricing {
    fn kind(&self) -> ModelKind {
        ModelKind::DerivativePricing
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

    fn payoff_summary(&self, probability: f64) -> Option<PayoffSummary> {
        let expected_payoff = self.post_processing(probability);
        let discount_factor = self.discount_factor();
        Some(PayoffSummary {
            expected_payoff,
            discount_factor,
            discounted_payoff: discount_factor * expected_payoff,
            linearization_error: self.linearization_error(),
        })
    }
}

/// Call payoff `max(price − strike, 0)` over `[0, f_max]`.
fn payoff_function(config: &DerivativePricingConfig) -> Result<LinearAmplitudeFunction, AppError> {
    let f_max = config.max_price();
    LinearAmplitudeFunction::new(
        config.num_price_qubits(),
        &[0.0, 1.0],
        &[0.0, 0.0],
        (0.0, f_max),
        (0.0, f_max - config.strike_price),
        &[0.0, config.strike_price],
        config.c_approx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strike: f64, time_steps: usize, probs: (f64, f64), ip: u32, fp: u32) -> DerivativePricingConfig {
        DerivativePricingConfig {
            strike_price: strike,
            time_steps,
            prob_gb: probs.0,
            prob_bg: probs.1,
            integer_precision: ip,
            fractional_precision: fp,
            ..Default::default()
        }
    }

    #[test]
    fn reference_table() {
        let cases = [
            (config(1.0, 3, (0.07, 0.11), 4, 1), 0.46150043, 0.29915102),
            (config(0.95, 3, (0.07, 0.11), 4, 1), 0.46162372, 0.34760025),
            (config(1.0, 4, (0.07, 0.11), 4, 1), 0.46150945, 0.30265278),
            (config(1.0, 3, (0.1, 0.3), 4, 1), 0.46144403, 0.27725086),
            (config(1.0, 3, (0.1, 0.3), 5, 1), 0.46140614, 0.53798109),
            (config(1.0, 3, (0.1, 0.3), 4, 2), 0.46168391, 0.37343947),
        ];
        for (config, expected, payoff) in cases {
            let model = DerivativePricing::new(config.clone()).unwrap();
            let p = model.objective_distribution().unwrap()[1];
            assert!((p - expected).abs() < 1e-4, "{config:?}: {p} vs {expected}");
            let value = model.post_processing(p);
            assert!((value - payoff).abs() < 1e-2, "{config:?}: payoff {value} vs {payoff}");
        }
    }

    #[test]
    fn default_parameters() {
        let model = DerivativePricing::new(DerivativePricingConfig::default()).unwrap();
        let p = model.objective_distribution().unwrap()[1];
        assert!((p - 0.46188697).abs() < 1e-4, "{p}");
        assert!((model.post_processing(p) - 0.04395948).abs() < 2e-3);
    }

    #[test]
    fn objective_is_payoff_target() {
        let model = DerivativePricing::new(config(1.0, 3, (0.1, 0.3), 4, 1)).unwrap();
        let n = 4 + 1 + 1;
        assert_eq!(model.num_qubits(), 1 + 2 * 3 + n + 1 + n);
        assert_eq!(model.objective(), model.num_qubits() - model.payoff().num_ancillas() - 1);
        assert_eq!(model.layout().range("price").unwrap().start, 7);
    }

    #[test]
    fn payoff_is_flat_below_strike() {
        let model = DerivativePricing::new(DerivativePricingConfig::default()).unwrap();
        let payoff = model.payoff();
        // Price register value v encodes v / 2^fp; strike 1.0 sits at 64.
        assert_eq!(payoff.angle(10), payoff.angle(63));
        assert!(payoff.angle(100) > payoff.angle(64));
    }

    #[test]
    fn payoff_summary_discounts_the_post_processed_value() {
        let model = DerivativePricing::new(DerivativePricingConfig::default()).unwrap();
        let p = model.objective_distribution().unwrap()[1];
        let summary = model.payoff_summary(p).unwrap();
        assert_eq!(summary.expected_payoff, model.post_processing(p));
        assert!((summary.discounted_payoff - summary.expected_payoff * (-0.1f64 / 12.0).exp()).abs() < 1e-15);
        assert_eq!(summary.linearization_error, model.linearization_error());
    }

    #[test]
    fn discount_factor_uses_rate_and_horizon() {
        let model = DerivativePricing::new(DerivativePricingConfig::default()).unwrap();
        assert!((model.discount_factor() - (-0.1f64 / 12.0).exp()).abs() < 1e-15);
    }

    #[test]
    fn linearization_error_grows_with_horizon() {
        let short = DerivativePricing::new(DerivativePricingConfig::default()).unwrap();
        let long = DerivativePricing::new(DerivativePricingConfig {
            time_tot: 2.0,
            ..Default::default()
        })
        .unwrap();
        assert!(short.linearization_error() < 0.05);
        assert!(long.linearization_error() > short.linearization_error());
        assert!(long.linearization_error() > long.config().linearization_tolerance);
    }

    #[test]
    fn widest_price_register_assembles() {
        let model = DerivativePricing::new(config(1.0, 3, (0.1, 0.3), 4, 7)).unwrap();
        assert_eq!(model.layout().range("price").unwrap().len, crate::domain::MAX_ARITHMETIC_QUBITS);
        let err = DerivativePricing::new(config(1.0, 3, (0.1, 0.3), 4, 8)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn strike_outside_price_range_is_rejected() {
        let err = DerivativePricing::new(config(40.0, 3, (0.1, 0.3), 1, 2)).unwrap_err();
        assert!(err.message().contains("strike_price"));
    }
}
