//! Command-line parsing for the `rq` binary.
//!
//! Argument parsing and command dispatch stay separate from the circuit and
//! estimation code. Every model flag is optional: unset flags fall back to the
//! `--config` file, then to the model defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::RegimeWiring;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "rq",
    version,
    about = "Regime-switching credit risk and derivative pricing circuits with amplitude estimation"
)]
pub struct Cli {
    /// Log filter (`info`, `debug`, `regime_qae=trace`, ...); overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Multi-period credit loss: P(weighted defaults <= loss).
    Static(StaticArgs),
    /// Regime-dependent portfolio growth compared against a loss level.
    Dynamic(DynamicArgs),
    /// Call-style payoff on a regime-switching binomial price lattice.
    Derivative(DerivativeArgs),
}

/// Options shared by every model.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// JSON file with the model configuration (flags override its values).
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Also estimate the objective probability with MLAE on the sampling backend.
    #[arg(long)]
    pub mlae: bool,

    /// Shots per MLAE circuit.
    #[arg(long, default_value_t = 10_000)]
    pub shots: u64,

    /// Seed for the sampling backend.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the run (config + results) as JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct StaticArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Loss threshold (weighted number of defaulted groups).
    #[arg(long)]
    pub loss: Option<u64>,

    /// Markov chain steps after the stationary prior.
    #[arg(long)]
    pub time_steps: Option<usize>,

    /// Probability of moving from the good to the bad regime.
    #[arg(long)]
    pub prob_gb: Option<f64>,

    /// Probability of moving from the bad to the good regime.
    #[arg(long)]
    pub prob_bg: Option<f64>,

    /// Good-regime default thresholds, one per group (comma separated).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub default_probs_good: Vec<f64>,

    /// Bad-regime default thresholds, one per group (comma separated).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub default_probs_bad: Vec<f64>,

    /// Good-regime factor loadings, one per group (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub sensitivities_good: Vec<f64>,

    /// Bad-regime factor loadings, one per group (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub sensitivities_bad: Vec<f64>,

    /// Loss weight per group (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub weights: Vec<u64>,

    /// Qubits used for the systemic factor.
    #[arg(long)]
    pub z_qubits: Option<usize>,

    /// Which fitted encoder the bad regime bit selects.
    #[arg(long, value_enum)]
    pub regime_wiring: Option<RegimeWiring>,
}

#[derive(Debug, Args, Clone)]
pub struct DynamicArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Loss level the accumulated growth is compared against.
    #[arg(long, allow_negative_numbers = true)]
    pub loss: Option<i64>,

    #[arg(long)]
    pub time_steps: Option<usize>,

    #[arg(long)]
    pub prob_gb: Option<f64>,

    #[arg(long)]
    pub prob_bg: Option<f64>,

    /// Per-step increment in the good regime.
    #[arg(long, allow_negative_numbers = true)]
    pub growth_good: Option<f64>,

    /// Per-step increment in the bad regime.
    #[arg(long, allow_negative_numbers = true)]
    pub growth_bad: Option<f64>,

    /// Fractional bits of the fixed-point sum register.
    #[arg(long)]
    pub fractional_precision: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct DerivativeArgs {
    #[command(flatten)]
    pub run: RunArgs,

    #[arg(long)]
    pub strike_price: Option<f64>,

    #[arg(long)]
    pub time_steps: Option<usize>,

    #[arg(long)]
    pub prob_gb: Option<f64>,

    #[arg(long)]
    pub prob_bg: Option<f64>,

    /// Integer bits of the price register.
    #[arg(long)]
    pub integer_precision: Option<u32>,

    /// Fractional bits of the price register.
    #[arg(long)]
    pub fractional_precision: Option<u32>,

    #[arg(long)]
    pub starting_price: Option<f64>,

    /// Horizon in years.
    #[arg(long)]
    pub time_tot: Option<f64>,

    /// Discount rate.
    #[arg(long, allow_negative_numbers = true)]
    pub r: Option<f64>,

    /// Payoff rescaling factor in (0, 1].
    #[arg(long)]
    pub c_approx: Option<f64>,

    /// Base volatility as `good,bad`.
    #[arg(long, value_delimiter = ',')]
    pub base_volatility: Vec<f64>,

    /// Drift rate as `good,bad`.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub regime_rate: Vec<f64>,

    /// Largest accepted `e^x − (1 + x)` before a warning is logged.
    #[arg(long)]
    pub linearization_tolerance: Option<f64>,
}
