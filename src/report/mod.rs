//! Terminal output for model runs.
//!
//! Formatting lives here so the circuit and estimation code stays free of
//! presentation concerns.

use crate::app::pipeline::RunOutput;
use crate::domain::ModelConfig;

/// Full run summary: configuration, register layout, exact and estimated figures.
pub fn format_run_summary(run: &RunOutput, config: &ModelConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== rq - {} ===\n", run.model.display_name()));
    out.push_str(&format_config_line(config));
    out.push_str(&format!(
        "Circuit: '{}' | qubits={} | instructions={} | objective=q{}\n",
        run.circuit_name, run.num_qubits, run.num_instructions, run.objective
    ));

    out.push_str("\nRegisters:\n");
    for (name, range) in &run.registers {
        if range.is_empty() {
            out.push_str(&format!("  {name:<22} (none)\n"));
        } else {
            out.push_str(&format!(
                "  {name:<22} q{}..q{} ({})\n",
                range.start,
                range.end() - 1,
                range.len
            ));
        }
    }

    let ops: Vec<String> = run.op_counts.iter().map(|(op, n)| format!("{op}={n}")).collect();
    out.push_str(&format!("Operations: {}\n", ops.join(" ")));

    out.push_str(&format!(
        "\nExact objective distribution: P(0)={:.8} P(1)={:.8}\n",
        run.exact_distribution[0], run.exact_distribution[1]
    ));

    if let Some(p) = &run.payoff {
        out.push_str(&format!(
            "Expected payoff: {:.6} | discount={:.6} | discounted={:.6}\n",
            p.expected_payoff, p.discount_factor, p.discounted_payoff
        ));
        out.push_str(&format!("Linearisation error bound: {:.3e}\n", p.linearization_error));
    }

    if let Some(mle) = &run.mlae {
        out.push_str(&format!(
            "\nMLAE estimate: {:.6} (theta={:.6}, |error|={:.2e})\n",
            mle.estimate,
            mle.theta,
            (mle.estimate - run.exact_distribution[1]).abs()
        ));
        if let Some(good) = &mle.good_counts {
            out.push_str("  k   good / shots\n");
            for ((k, g), n) in crate::estimation::POWERS.iter().zip(good).zip(&mle.total_counts) {
                out.push_str(&format!("  {k:<3} {g} / {n}\n"));
            }
        }
        if let Some(value) = run.mlae_payoff {
            out.push_str(&format!("MLAE payoff: {value:.6}\n"));
        }
    }

    out
}

fn format_config_line(config: &ModelConfig) -> String {
    match config {
        ModelConfig::StaticCreditRisk(c) => format!(
            "loss={} | T={} | p_gb={} p_bg={} | groups={} weights={:?} | z_qubits={} | wiring={:?}\n",
            c.loss,
            c.time_steps,
            c.prob_gb,
            c.prob_bg,
            c.groups(),
            c.weights,
            c.z_qubits,
            c.regime_wiring
        ),
        ModelConfig::DynamicCreditRisk(c) => format!(
            "loss={} | T={} | p_gb={:.6} p_bg={:.6} | growth={:?} | fp={}\n",
            c.loss, c.time_steps, c.prob_gb, c.prob_bg, c.growth_possibilities, c.fractional_precision
        ),
        ModelConfig::DerivativePricing(c) => format!(
            "K={} | T={} | p_gb={} p_bg={} | ip={} fp={} | S0={} | horizon={:.4}y | r={} | c={}\n",
            c.strike_price,
            c.time_steps,
            c.prob_gb,
            c.prob_bg,
            c.integer_precision,
            c.fractional_precision,
            c.starting_price,
            c.time_tot,
            c.r,
            c.c_approx
        ),
    }
}
