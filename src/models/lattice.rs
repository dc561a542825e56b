//! Regime-switching binomial price lattice in log space.

use serde::Serialize;

use crate::circuit::{Circuit, phase_adder};
use crate::error::AppError;

/// Volatility added on top of the base level grows by `1.2·t` up to this cap.
const VOLATILITY_RAMP_CAP: f64 = 0.1;
const VOLATILITY_RAMP_RATE: f64 = 1.2;

/// Up/down log increments of one lattice step, indexed by regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepIncrements {
    pub up: [f64; 2],
    pub down: [f64; 2],
}

impl StepIncrements {
    pub fn max_abs(&self) -> f64 {
        self.up
            .iter()
            .chain(&self.down)
            .fold(0.0f64, |m, x| m.max(x.abs()))
    }
}

/// Lattice parameters shared by both regimes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeParams {
    pub time_steps: usize,
    pub time_tot: f64,
    pub base_volatility: [f64; 2],
    pub regime_rate: [f64; 2],
}

impl LatticeParams {
    pub fn dt(&self) -> f64 {
        self.time_tot / self.time_steps as f64
    }

    pub fn volatility(&self, regime: usize, step: usize) -> f64 {
        let ramp = (VOLATILITY_RAMP_RATE * step as f64 * self.dt()).clamp(0.0, VOLATILITY_RAMP_CAP);
        self.base_volatility[regime] + ramp
    }

    pub fn drift(&self, regime: usize, step: usize) -> f64 {
        let sigma = self.volatility(regime, step);
        self.regime_rate[regime] - sigma * sigma / 2.0
    }

    pub fn increments(&self, step: usize) -> StepIncrements {
        let dt = self.dt();
        let mut out = StepIncrements {
            up: [0.0; 2],
            down: [0.0; 2],
        };
        for regime in 0..2 {
            let drift = self.drift(regime, step) * dt;
            let shock = self.volatility(regime, step) * dt.sqrt();
            out.up[regime] = drift + shock;
            out.down[regime] = drift - shock;
        }
        out
    }

    /// Worst-case log excursion `T·max(|mu|·dt + sigma·√dt)`.
    pub fn max_log_excursion(&self) -> f64 {
        let dt = self.dt();
        let worst = (0..self.time_steps)
            .flat_map(|step| {
                (0..2).map(move |regime| {
                    self.drift(regime, step).abs() * dt + self.volatility(regime, step) * dt.sqrt()
                })
            })
            .fold(0.0f64, f64::max);
        self.time_steps as f64 * worst
    }
}

/// Evolves a Fourier-basis price register through the lattice.
///
/// Layout: `[regime bits (T) | branch bits (T) | price register]`. Step `i`
/// is controlled by regime bit `i` and branch bit `i`; branch `|0⟩` moves up.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLatticeEvolver {
    params: LatticeParams,
    num_price_qubits: usize,
    fractional_precision: u32,
}

impl PriceLatticeEvolver {
    pub fn new(
        params: LatticeParams,
        num_price_qubits: usize,
        fractional_precision: u32,
    ) -> Result<Self, AppError> {
        if params.time_steps == 0 {
            return Err(AppError::invalid("time_steps", "must be >= 1"));
        }
        if num_price_qubits == 0 {
            return Err(AppError::invalid("price register", "must be >= 1 qubit"));
        }
        Ok(Self {
            params,
            num_price_qubits,
            fractional_precision,
        })
    }

    pub fn params(&self) -> &LatticeParams {
        &self.params
    }

    pub fn num_qubits(&self) -> usize {
        2 * self.params.time_steps + self.num_price_qubits
    }

    pub fn increments(&self) -> Vec<StepIncrements> {
        (0..self.params.time_steps)
            .map(|step| self.params.increments(step))
            .collect()
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let t = self.params.time_steps;
        let n = self.num_price_qubits;
        let price: Vec<usize> = (2 * t..2 * t + n).collect();
        let mut circ = Circuit::new("price_evolution", self.num_qubits());

        for (step, inc) in self.increments().into_iter().enumerate() {
            let mut qubits = vec![step, t + step];
            qubits.extend(&price);
            for regime in 0..2 {
                let bad = regime == 1;
                let up = phase_adder(n, inc.up[regime], self.fractional_precision)?;
                circ.compose(&up.controlled(&[bad, false]), &qubits)?;
                let down = phase_adder(n, inc.down[regime], self.fractional_precision)?;
                circ.compose(&down.controlled(&[bad, true]), &qubits)?;
            }
        }
        Ok(circ)
    }
}
