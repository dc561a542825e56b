//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module is the
//! "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - merges `--config` files with flag overrides into a model config
//! - runs the shared pipeline
//! - prints the summary and writes the optional export

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DerivativeArgs, DynamicArgs, RunArgs, StaticArgs};
use crate::domain::{DerivativePricingConfig, DynamicCreditRiskConfig, ModelConfig, StaticCreditRiskConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `rq` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let (config, run_args) = match &cli.command {
        Command::Static(args) => (ModelConfig::StaticCreditRisk(static_config_from_args(args)?), &args.run),
        Command::Dynamic(args) => (ModelConfig::DynamicCreditRisk(dynamic_config_from_args(args)?), &args.run),
        Command::Derivative(args) => (
            ModelConfig::DerivativePricing(derivative_config_from_args(args)?),
            &args.run,
        ),
    };

    let options = estimation_options(run_args);
    let run = pipeline::run_model(&config, &options)?;
    println!("{}", crate::report::format_run_summary(&run, &config));

    if let Some(path) = &run_args.export {
        crate::io::write_run_json(path, &config, &run)?;
        tracing::info!(path = %path.display(), "run exported");
    }
    Ok(())
}

/// `--log-level` wins over `RUST_LOG`; the fallback is `info`.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

pub fn estimation_options(args: &RunArgs) -> pipeline::EstimationOptions {
    pipeline::EstimationOptions {
        mlae: args.mlae,
        shots: args.shots,
        seed: args.seed,
    }
}

fn base_config<T: Default + serde::de::DeserializeOwned>(args: &RunArgs) -> Result<T, AppError> {
    match &args.config {
        Some(path) => crate::io::read_config_json(path),
        None => Ok(T::default()),
    }
}

pub fn static_config_from_args(args: &StaticArgs) -> Result<StaticCreditRiskConfig, AppError> {
    let mut config: StaticCreditRiskConfig = base_config(&args.run)?;
    override_with(&mut config.loss, args.loss);
    override_with(&mut config.time_steps, args.time_steps);
    override_with(&mut config.prob_gb, args.prob_gb);
    override_with(&mut config.prob_bg, args.prob_bg);
    override_list(&mut config.default_probs[0], &args.default_probs_good);
    override_list(&mut config.default_probs[1], &args.default_probs_bad);
    override_list(&mut config.sensitivities[0], &args.sensitivities_good);
    override_list(&mut config.sensitivities[1], &args.sensitivities_bad);
    override_list(&mut config.weights, &args.weights);
    override_with(&mut config.z_qubits, args.z_qubits);
    override_with(&mut config.regime_wiring, args.regime_wiring);
    Ok(config)
}

pub fn dynamic_config_from_args(args: &DynamicArgs) -> Result<DynamicCreditRiskConfig, AppError> {
    let mut config: DynamicCreditRiskConfig = base_config(&args.run)?;
    override_with(&mut config.loss, args.loss);
    override_with(&mut config.time_steps, args.time_steps);
    override_with(&mut config.prob_gb, args.prob_gb);
    override_with(&mut config.prob_bg, args.prob_bg);
    override_with(&mut config.growth_possibilities[0], args.growth_good);
    override_with(&mut config.growth_possibilities[1], args.growth_bad);
    override_with(&mut config.fractional_precision, args.fractional_precision);
    Ok(config)
}

pub fn derivative_config_from_args(args: &DerivativeArgs) -> Result<DerivativePricingConfig, AppError> {
    let mut config: DerivativePricingConfig = base_config(&args.run)?;
    override_with(&mut config.strike_price, args.strike_price);
    override_with(&mut config.time_steps, args.time_steps);
    override_with(&mut config.prob_gb, args.prob_gb);
    override_with(&mut config.prob_bg, args.prob_bg);
    override_with(&mut config.integer_precision, args.integer_precision);
    override_with(&mut config.fractional_precision, args.fractional_precision);
    override_with(&mut config.starting_price, args.starting_price);
    override_with(&mut config.time_tot, args.time_tot);
    override_with(&mut config.r, args.r);
    override_with(&mut config.c_approx, args.c_approx);
    override_pair(&mut config.base_volatility, &args.base_volatility, "base_volatility")?;
    override_pair(&mut config.regime_rate, &args.regime_rate, "regime_rate")?;
    override_with(&mut config.linearization_tolerance, args.linearization_tolerance);
    Ok(config)
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn override_list<T: Clone>(slot: &mut Vec<T>, values: &[T]) {
    if !values.is_empty() {
        *slot = values.to_vec();
    }
}

fn override_pair(slot: &mut [f64; 2], values: &[f64], field: &str) -> Result<(), AppError> {
    match values {
        [] => Ok(()),
        [good, bad] => {
            *slot = [*good, *bad];
            Ok(())
        }
        _ => Err(AppError::invalid(
            field,
            format!("expects exactly two values `good,bad`, got {}", values.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RegimeWiring;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args.iter().copied()).unwrap().command
    }

    #[test]
    fn flags_override_defaults() {
        let Command::Static(args) = parse(&["rq", "static", "--loss", "2", "--regime-wiring", "regime-conditioned"])
        else {
            panic!("expected static");
        };
        let config = static_config_from_args(&args).unwrap();
        assert_eq!(config.loss, 2);
        assert_eq!(config.regime_wiring, RegimeWiring::RegimeConditioned);
        assert_eq!(config.weights, vec![1, 2]);
    }

    #[test]
    fn dynamic_growth_overrides_one_regime() {
        let Command::Dynamic(args) = parse(&["rq", "dynamic", "--growth-bad", "-0.2", "--time-steps", "4"]) else {
            panic!("expected dynamic");
        };
        let config = dynamic_config_from_args(&args).unwrap();
        assert_eq!(config.growth_possibilities, [0.771, -0.2]);
        assert_eq!(config.time_steps, 4);
    }

    #[test]
    fn derivative_pair_needs_two_values() {
        let Command::Derivative(args) = parse(&["rq", "derivative", "--regime-rate", "0.05"]) else {
            panic!("expected derivative");
        };
        let err = derivative_config_from_args(&args).unwrap_err();
        assert!(err.message().contains("regime_rate"));

        let Command::Derivative(args) = parse(&["rq", "derivative", "--regime-rate", "0.05,0.01", "--shots", "99"])
        else {
            panic!("expected derivative");
        };
        assert_eq!(derivative_config_from_args(&args).unwrap().regime_rate, [0.05, 0.01]);
        assert_eq!(estimation_options(&args.run).shots, 99);
    }

    #[test]
    fn config_file_is_the_base_layer() {
        let path = std::env::temp_dir().join(format!("rq-app-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"loss": 3, "time_steps": 2}"#).unwrap();
        let path_arg = path.to_string_lossy().to_string();
        let Command::Static(args) = parse(&["rq", "static", "--config", path_arg.as_str(), "--time-steps", "5"]) else {
            panic!("expected static");
        };
        let config = static_config_from_args(&args).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.loss, 3);
        assert_eq!(config.time_steps, 5);
    }
}
