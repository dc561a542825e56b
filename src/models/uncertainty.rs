//! Regime-conditioned default probabilities for the static credit model.
//!
//! Each obligor group gets a linear angle fit `theta(j) ≈ a·j + b` of the
//! Gaussian-copula default probability over the discretised systemic factor
//! `j`. The fit is applied once per time step, so every angle is divided by
//! `time_steps`.

use tracing::debug;

use crate::circuit::{Circuit, PolynomialRotation};
use crate::domain::RegimeWiring;
use crate::error::AppError;
use crate::math::{LineFit, linear_regression, normal_cdf};

/// Fitted per-step rotations for one regime.
#[derive(Debug, Clone, PartialEq)]
pub struct OneStepUncertainty {
    z_qubits: usize,
    fits: Vec<LineFit>,
}

impl OneStepUncertainty {
    pub fn fit(
        default_probs: &[f64],
        sensitivities: &[f64],
        z_qubits: usize,
        time_steps: usize,
    ) -> Result<Self, AppError> {
        if default_probs.len() != sensitivities.len() {
            return Err(AppError::invalid(
                "sensitivities",
                format!(
                    "has {} entries but default_probs has {}",
                    sensitivities.len(),
                    default_probs.len()
                ),
            ));
        }
        if z_qubits == 0 {
            return Err(AppError::invalid("z_qubits", "must be >= 1"));
        }
        if time_steps == 0 {
            return Err(AppError::invalid("time_steps", "must be >= 1"));
        }

        let xs: Vec<f64> = (0..1usize << z_qubits).map(|j| j as f64).collect();
        let mut fits = Vec::with_capacity(default_probs.len());
        for (group, (&dp, &s)) in default_probs.iter().zip(sensitivities).enumerate() {
            let thetas: Vec<f64> = xs
                .iter()
                .map(|&j| {
                    let pk = normal_cdf((dp - s.sqrt() * j) / (1.0 - s).sqrt()).clamp(0.0, 1.0);
                    2.0 * pk.sqrt().asin() / time_steps as f64
                })
                .collect();
            let fit = linear_regression(&xs, &thetas)?;
            debug!(group, slope = fit.slope, intercept = fit.intercept, "fitted default rotation");
            fits.push(fit);
        }
        Ok(Self { z_qubits, fits })
    }

    pub fn fits(&self) -> &[LineFit] {
        &self.fits
    }

    pub fn groups(&self) -> usize {
        self.fits.len()
    }

    /// `[z register | one indicator qubit per group]`.
    pub fn num_qubits(&self) -> usize {
        self.z_qubits + self.groups()
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let z = self.z_qubits;
        let mut circ = Circuit::new("one_step_uncertainty", self.num_qubits());
        for (group, fit) in self.fits.iter().enumerate() {
            let rotation = PolynomialRotation::new(z, vec![fit.intercept, fit.slope]).circuit()?;
            let mut qubits: Vec<usize> = (0..z).collect();
            qubits.push(z + group);
            circ.compose(&rotation, &qubits)?;
        }
        Ok(circ)
    }
}

/// Applies a regime's [`OneStepUncertainty`] for every time step.
///
/// Layout: `[regime bits (time_steps) | z register | group indicators]`.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyEncoder {
    time_steps: usize,
    good: OneStepUncertainty,
    bad: OneStepUncertainty,
    wiring: RegimeWiring,
}

impl UncertaintyEncoder {
    pub fn new(
        time_steps: usize,
        good: OneStepUncertainty,
        bad: OneStepUncertainty,
        wiring: RegimeWiring,
    ) -> Result<Self, AppError> {
        if good.num_qubits() != bad.num_qubits() {
            return Err(AppError::invalid(
                "default_probs",
                format!(
                    "good regime spans {} qubits but bad regime spans {}",
                    good.num_qubits(),
                    bad.num_qubits()
                ),
            ));
        }
        Ok(Self {
            time_steps,
            good,
            bad,
            wiring,
        })
    }

    pub fn good(&self) -> &OneStepUncertainty {
        &self.good
    }

    pub fn bad(&self) -> &OneStepUncertainty {
        &self.bad
    }

    pub fn wiring(&self) -> RegimeWiring {
        self.wiring
    }

    pub fn num_qubits(&self) -> usize {
        self.time_steps + self.good.num_qubits()
    }

    /// Encoder applied when the regime bit is `|1⟩`.
    fn bad_state_encoder(&self) -> &OneStepUncertainty {
        match self.wiring {
            RegimeWiring::GoodOnly => &self.good,
            RegimeWiring::RegimeConditioned => &self.bad,
        }
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let when_good = self.good.circuit()?.controlled(&[false]);
        let when_bad = self.bad_state_encoder().circuit()?.controlled(&[true]);

        let mut circ = Circuit::new("mc_uncertainty", self.num_qubits());
        let targets: Vec<usize> = (self.time_steps..self.num_qubits()).collect();
        for step in 0..self.time_steps {
            let mut qubits = Vec::with_capacity(targets.len() + 1);
            qubits.push(step);
            qubits.extend(&targets);
            circ.compose(&when_good, &qubits)?;
            circ.compose(&when_bad, &qubits)?;
        }
        Ok(circ)
    }
}
