//! Shared domain types.
//!
//! Configs are plain serialisable values so they can be:
//!
//! - built from CLI flags or loaded from JSON
//! - validated once before any qubit is allocated
//! - echoed back in exported run reports

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Widest Fourier-basis arithmetic register (growth sum, price) a config may ask for.
///
/// Keeps every accepted configuration within reach of the statevector backend.
pub const MAX_ARITHMETIC_QUBITS: usize = 12;

/// Measured bitstring -> observed frequency. Classical bit 0 is the rightmost character.
pub type Counts = BTreeMap<String, u64>;

/// Transition probabilities of the two-state economy.
///
/// State 0 is the good regime, state 1 the bad one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPair {
    /// good -> bad
    pub prob_gb: f64,
    /// bad -> good
    pub prob_bg: f64,
}

impl ProbabilityPair {
    pub fn new(prob_gb: f64, prob_bg: f64) -> Result<Self, AppError> {
        check_open_unit("prob_gb", prob_gb)?;
        check_open_unit("prob_bg", prob_bg)?;
        Ok(Self { prob_gb, prob_bg })
    }

    /// Long-run probability of the bad regime.
    pub fn stationary_bad(&self) -> f64 {
        self.prob_gb / (self.prob_gb + self.prob_bg)
    }

    pub fn angles(&self) -> RotationAngles {
        RotationAngles::from_pair(self)
    }
}

/// `RY` angles that encode a [`ProbabilityPair`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationAngles {
    /// Sets `P(|1⟩)` of the first qubit to the stationary bad probability.
    pub theta_naught: f64,
    /// Good-regime transition: `P(|1⟩) = prob_gb`.
    pub theta0: f64,
    /// Bad-regime persistence: `P(|1⟩) = 1 − prob_bg`.
    pub theta1: f64,
}

impl RotationAngles {
    pub fn from_pair(pair: &ProbabilityPair) -> Self {
        let ProbabilityPair { prob_gb, prob_bg } = *pair;
        Self {
            theta_naught: 2.0 * (prob_bg / (prob_gb + prob_bg)).sqrt().acos(),
            theta0: 2.0 * (1.0 - prob_gb).sqrt().acos(),
            theta1: 2.0 * prob_bg.sqrt().acos(),
        }
    }
}

/// How the per-regime default encoders are wired to the regime bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RegimeWiring {
    /// The good-regime fit is applied for both regime states (reference behaviour).
    #[default]
    GoodOnly,
    /// The bad-regime fit is applied when the regime bit is |1⟩.
    RegimeConditioned,
}

/// Which assembled circuit a run builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    StaticCreditRisk,
    DynamicCreditRisk,
    DerivativePricing,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::StaticCreditRisk => "StaticCreditRisk",
            ModelKind::DynamicCreditRisk => "DynamicCreditRisk",
            ModelKind::DerivativePricing => "DerivativePricing",
        }
    }
}

/// Multi-period credit loss with Gaussian-copula obligor groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCreditRiskConfig {
    pub loss: u64,
    pub time_steps: usize,
    pub prob_gb: f64,
    pub prob_bg: f64,
    /// `[good, bad]` default thresholds per group.
    pub default_probs: [Vec<f64>; 2],
    /// `[good, bad]` factor loadings per group.
    pub sensitivities: [Vec<f64>; 2],
    pub weights: Vec<u64>,
    pub z_qubits: usize,
    pub regime_wiring: RegimeWiring,
}

impl Default for StaticCreditRiskConfig {
    fn default() -> Self {
        Self {
            loss: 1,
            time_steps: 3,
            prob_gb: 0.1,
            prob_bg: 0.3,
            default_probs: [vec![0.1, 0.2], vec![0.15, 0.25]],
            sensitivities: [vec![0.1, 0.05], vec![0.15, 0.1]],
            weights: vec![1, 2],
            z_qubits: 3,
            regime_wiring: RegimeWiring::GoodOnly,
        }
    }
}

impl StaticCreditRiskConfig {
    pub fn groups(&self) -> usize {
        self.default_probs[0].len()
    }

    /// Checks every field; shape mismatches are reported before anything else.
    pub fn validate(&self) -> Result<(), AppError> {
        let groups = self.groups();
        if groups == 0 {
            return Err(AppError::invalid("default_probs", "must describe at least one obligor group"));
        }
        let shapes = [
            ("default_probs[1]", self.default_probs[1].len()),
            ("sensitivities[0]", self.sensitivities[0].len()),
            ("sensitivities[1]", self.sensitivities[1].len()),
            ("weights", self.weights.len()),
        ];
        for (field, len) in shapes {
            if len != groups {
                return Err(AppError::invalid(
                    field,
                    format!("has {len} entries but default_probs[0] describes {groups} groups"),
                ));
            }
        }

        check_time_steps(self.time_steps)?;
        ProbabilityPair::new(self.prob_gb, self.prob_bg)?;
        if self.loss == u64::MAX {
            return Err(AppError::invalid("loss", format!("must be < {}", u64::MAX)));
        }
        if self.z_qubits == 0 {
            return Err(AppError::invalid("z_qubits", "must be >= 1"));
        }
        if self.z_qubits > 16 {
            return Err(AppError::invalid("z_qubits", format!("must be <= 16, got {}", self.z_qubits)));
        }
        for (regime, probs) in self.default_probs.iter().enumerate() {
            if let Some(p) = probs.iter().find(|p| !p.is_finite()) {
                return Err(AppError::invalid(
                    &format!("default_probs[{regime}]"),
                    format!("must be finite, got {p}"),
                ));
            }
        }
        for (regime, sens) in self.sensitivities.iter().enumerate() {
            if let Some(s) = sens.iter().find(|s| !(**s >= 0.0 && **s < 1.0)) {
                return Err(AppError::invalid(
                    &format!("sensitivities[{regime}]"),
                    format!("must lie in [0, 1), got {s}"),
                ));
            }
        }
        match self.weights.iter().try_fold(0u64, |acc, w| acc.checked_add(*w)) {
            None => return Err(AppError::invalid("weights", format!("must sum to at most {}", u64::MAX))),
            Some(0) => return Err(AppError::invalid("weights", "must sum to a positive value")),
            Some(_) => {}
        }
        Ok(())
    }
}

/// Portfolio growth accumulated per regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicCreditRiskConfig {
    pub loss: i64,
    pub time_steps: usize,
    pub prob_gb: f64,
    pub prob_bg: f64,
    /// `[good, bad]` per-step increment.
    pub growth_possibilities: [f64; 2],
    pub fractional_precision: u32,
}

impl Default for DynamicCreditRiskConfig {
    fn default() -> Self {
        Self {
            loss: 1,
            time_steps: 3,
            prob_gb: 0.009708737864077669,
            prob_bg: 0.1111111111111111,
            growth_possibilities: [0.771, 0.0],
            fractional_precision: 2,
        }
    }
}

impl DynamicCreditRiskConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        check_time_steps(self.time_steps)?;
        ProbabilityPair::new(self.prob_gb, self.prob_bg)?;
        if self.growth_possibilities.iter().any(|g| !g.is_finite()) {
            return Err(AppError::invalid(
                "growth_possibilities",
                format!("must be finite, got {:?}", self.growth_possibilities),
            ));
        }
        if self.growth_possibilities.iter().all(|g| *g == 0.0) {
            return Err(AppError::invalid(
                "growth_possibilities",
                "at least one increment must be non-zero",
            ));
        }
        if self.fractional_precision > 24 {
            return Err(AppError::invalid(
                "fractional_precision",
                format!("must be <= 24, got {}", self.fractional_precision),
            ));
        }
        let width = crate::models::sum_register_width(
            self.time_steps,
            self.growth_possibilities,
            self.fractional_precision,
        )?;
        if width > MAX_ARITHMETIC_QUBITS as i64 {
            return Err(AppError::invalid(
                "fractional_precision",
                format!(
                    "with growth {:?} over {} steps the sum register needs {width} qubits; the limit is {MAX_ARITHMETIC_QUBITS}",
                    self.growth_possibilities, self.time_steps
                ),
            ));
        }
        Ok(())
    }
}

/// Regime-switching binomial lattice with a call-style payoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativePricingConfig {
    pub strike_price: f64,
    pub time_steps: usize,
    pub prob_gb: f64,
    pub prob_bg: f64,
    pub integer_precision: u32,
    pub fractional_precision: u32,
    pub starting_price: f64,
    pub time_tot: f64,
    /// Discount rate applied to the reported payoff.
    pub r: f64,
    pub c_approx: f64,
    /// `[good, bad]` volatility at step 0.
    pub base_volatility: [f64; 2],
    /// `[good, bad]` drift rate.
    pub regime_rate: [f64; 2],
    /// Largest accepted `e^x − (1 + x)` before a warning is logged.
    pub linearization_tolerance: f64,
}

impl Default for DerivativePricingConfig {
    fn default() -> Self {
        Self {
            strike_price: 1.0,
            time_steps: 3,
            prob_gb: 0.1,
            prob_bg: 0.3,
            integer_precision: 1,
            fractional_precision: 6,
            starting_price: 1.0,
            time_tot: 1.0 / 12.0,
            r: 0.1,
            c_approx: 0.05,
            base_volatility: [0.2, 0.3],
            regime_rate: [0.2, 0.1],
            linearization_tolerance: 0.05,
        }
    }
}

impl DerivativePricingConfig {
    /// Qubits in the price register: sign/integer/fraction bits.
    pub fn num_price_qubits(&self) -> usize {
        self.integer_precision as usize + self.fractional_precision as usize + 1
    }

    /// Largest representable price, `2^(ip+1) − 2^(−fp)`.
    pub fn max_price(&self) -> f64 {
        2f64.powi(self.integer_precision as i32 + 1) - 2f64.powi(-(self.fractional_precision as i32))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_time_steps(self.time_steps)?;
        ProbabilityPair::new(self.prob_gb, self.prob_bg)?;
        if self.num_price_qubits() > MAX_ARITHMETIC_QUBITS {
            return Err(AppError::invalid(
                "integer_precision + fractional_precision",
                format!(
                    "must be <= {} (price register limit {MAX_ARITHMETIC_QUBITS} qubits), got {}",
                    MAX_ARITHMETIC_QUBITS - 1,
                    self.num_price_qubits() - 1
                ),
            ));
        }
        if !(self.starting_price.is_finite() && self.starting_price > 0.0) {
            return Err(AppError::invalid(
                "starting_price",
                format!("must be finite and > 0, got {}", self.starting_price),
            ));
        }
        if !(self.time_tot.is_finite() && self.time_tot > 0.0) {
            return Err(AppError::invalid(
                "time_tot",
                format!("must be finite and > 0, got {}", self.time_tot),
            ));
        }
        if !self.r.is_finite() {
            return Err(AppError::invalid("r", "must be finite"));
        }
        if !(self.c_approx > 0.0 && self.c_approx <= 1.0) {
            return Err(AppError::invalid(
                "c_approx",
                format!("must lie in (0, 1], got {}", self.c_approx),
            ));
        }
        let f_max = self.max_price();
        if !(self.strike_price >= 0.0 && self.strike_price < f_max) {
            return Err(AppError::invalid(
                "strike_price",
                format!("must lie in [0, {f_max}) for the configured precision, got {}", self.strike_price),
            ));
        }
        for (regime, vol) in self.base_volatility.iter().enumerate() {
            if !(vol.is_finite() && *vol >= 0.0) {
                return Err(AppError::invalid(
                    &format!("base_volatility[{regime}]"),
                    format!("must be finite and >= 0, got {vol}"),
                ));
            }
        }
        if self.regime_rate.iter().any(|r| !r.is_finite()) {
            return Err(AppError::invalid("regime_rate", "must be finite"));
        }
        if !(self.linearization_tolerance > 0.0) {
            return Err(AppError::invalid("linearization_tolerance", "must be > 0"));
        }
        Ok(())
    }
}

/// Configuration of one run, tagged by variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "kebab-case")]
pub enum ModelConfig {
    StaticCreditRisk(StaticCreditRiskConfig),
    DynamicCreditRisk(DynamicCreditRiskConfig),
    DerivativePricing(DerivativePricingConfig),
}

impl ModelConfig {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelConfig::StaticCreditRisk(_) => ModelKind::StaticCreditRisk,
            ModelConfig::DynamicCreditRisk(_) => ModelKind::DynamicCreditRisk,
            ModelConfig::DerivativePricing(_) => ModelKind::DerivativePricing,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            ModelConfig::StaticCreditRisk(c) => c.validate(),
            ModelConfig::DynamicCreditRisk(c) => c.validate(),
            ModelConfig::DerivativePricing(c) => c.validate(),
        }
    }
}

fn check_open_unit(field: &str, value: f64) -> Result<(), AppError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(AppError::invalid(
            field,
            format!("must lie strictly inside (0, 1), got {value}"),
        ))
    }
}

fn check_time_steps(time_steps: usize) -> Result<(), AppError> {
    if time_steps == 0 {
        return Err(AppError::invalid("time_steps", "must be >= 1"));
    }
    if time_steps > 16 {
        return Err(AppError::invalid("time_steps", format!("must be <= 16, got {time_steps}")));
    }
    Ok(())
}
