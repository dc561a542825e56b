//! Regime-dependent growth accumulated in the Fourier basis.

use crate::circuit::{Circuit, phase_adder};
use crate::error::AppError;

/// Adds `growth[regime]` into a fixed-point sum register once per time step.
///
/// Layout: `[regime bits (time_steps) | sum register]`. The sum register must
/// already be in the Fourier basis.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthEncoder {
    time_steps: usize,
    growth: [f64; 2],
    fractional_precision: u32,
    num_sum_qubits: usize,
}

impl GrowthEncoder {
    pub fn new(time_steps: usize, growth: [f64; 2], fractional_precision: u32) -> Result<Self, AppError> {
        if growth.iter().all(|g| *g == 0.0) {
            return Err(AppError::invalid(
                "growth_possibilities",
                "at least one increment must be non-zero",
            ));
        }
        let width = sum_register_width(time_steps, growth, fractional_precision)?;
        let num_sum_qubits = usize::try_from(width)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| {
                AppError::layout(format!(
                    "Insufficient register: growth sum register would be {width} qubits wide."
                ))
            })?;
        Ok(Self {
            time_steps,
            growth,
            fractional_precision,
            num_sum_qubits,
        })
    }

    pub fn num_sum_qubits(&self) -> usize {
        self.num_sum_qubits
    }

    pub fn num_qubits(&self) -> usize {
        self.time_steps + self.num_sum_qubits
    }

    pub fn fractional_precision(&self) -> u32 {
        self.fractional_precision
    }

    /// Non-zero increment with the smallest magnitude.
    pub fn smallest_increment(&self) -> f64 {
        self.growth
            .iter()
            .copied()
            .filter(|g| *g != 0.0)
            .fold(f64::INFINITY, |best, g| if g.abs() < best.abs() { g } else { best })
    }

    /// `[control | sum]`: adds `growth[s]` when the control is in state `s`.
    pub fn one_step(&self) -> Result<Circuit, AppError> {
        let n = self.num_sum_qubits;
        let mut circ = Circuit::new("add_growth", n + 1);
        let qubits: Vec<usize> = (0..=n).collect();
        for (state, &value) in self.growth.iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            let adder = phase_adder(n, value, self.fractional_precision)?;
            circ.compose(&adder.controlled(&[state == 1]), &qubits)?;
        }
        Ok(circ)
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let step = self.one_step()?;
        let mut circ = Circuit::new("growth", self.num_qubits());
        for regime in 0..self.time_steps {
            let mut qubits = Vec::with_capacity(self.num_sum_qubits + 1);
            qubits.push(regime);
            qubits.extend(self.time_steps..self.num_qubits());
            circ.compose(&step, &qubits)?;
        }
        Ok(circ)
    }
}

/// `2 + fp + ⌈log2(max|g|·time_steps)⌉`; may be non-positive for tiny growth.
///
/// Fails when the worst-case sum is not a finite positive number.
pub fn sum_register_width(time_steps: usize, growth: [f64; 2], fractional_precision: u32) -> Result<i64, AppError> {
    let max_growth = growth[0].abs().max(growth[1].abs());
    let span = max_growth * time_steps as f64;
    if !(span.is_finite() && span > 0.0) {
        return Err(AppError::invalid(
            "growth_possibilities",
            format!("worst-case sum over {time_steps} steps must be finite and non-zero, got {span}"),
        ));
    }
    let bits = span.log2().ceil() as i64;
    2i64.checked_add(i64::from(fractional_precision))
        .and_then(|w| w.checked_add(bits))
        .ok_or_else(|| AppError::invalid("growth_possibilities", "sum register width overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::qft;
    use crate::sim::Statevector;

    #[test]
    fn width_matches_worst_case_sum() {
        assert_eq!(sum_register_width(3, [0.771, 0.0], 2), Ok(6));
        assert_eq!(sum_register_width(3, [0.771, 0.0], 4), Ok(8));
        assert_eq!(sum_register_width(4, [1.2, 0.0], 2), Ok(7));
        assert_eq!(sum_register_width(1, [0.0, -0.5], 0), Ok(1));
    }

    #[test]
    fn overflowing_growth_span_is_rejected() {
        let err = sum_register_width(2, [1e308, 0.0], 2).unwrap_err();
        assert!(err.is_validation());
        assert!(err.message().contains("growth_possibilities"));
        let err = GrowthEncoder::new(2, [1e308, 0.0], 2).unwrap_err();
        assert!(err.is_validation());
        // Huge but finite: width is large, not saturated.
        assert_eq!(sum_register_width(1, [1e300, 0.0], 0), Ok(2 + 997));
    }

    #[test]
    fn all_zero_growth_is_a_validation_error() {
        let err = GrowthEncoder::new(3, [0.0, 0.0], 2).unwrap_err();
        assert!(err.is_validation());
        assert!(err.message().contains("growth_possibilities"));
    }

    #[test]
    fn tiny_growth_without_precision_has_no_register() {
        let err = GrowthEncoder::new(1, [0.01, 0.0], 0).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_LAYOUT);
    }

    #[test]
    fn smallest_increment_compares_magnitudes() {
        let encoder = GrowthEncoder::new(2, [0.5, -0.25], 2).unwrap();
        assert_eq!(encoder.smallest_increment(), -0.25);
        let encoder = GrowthEncoder::new(2, [0.0, 0.75], 2).unwrap();
        assert_eq!(encoder.smallest_increment(), 0.75);
    }

    #[test]
    fn zero_increment_adds_no_gates() {
        let encoder = GrowthEncoder::new(3, [0.75, 0.0], 2).unwrap();
        let step = encoder.one_step().unwrap();
        assert_eq!(step.len(), encoder.num_sum_qubits());
    }

    #[test]
    fn regime_bits_select_the_increment() {
        // good adds 0.5, bad adds 0.25; with fp = 2 that is +2 or +1 per step.
        let encoder = GrowthEncoder::new(2, [0.5, 0.25], 2).unwrap();
        let n = encoder.num_sum_qubits();
        let sum: Vec<usize> = (2..2 + n).collect();

        let mut circ = Circuit::new("wired", encoder.num_qubits());
        circ.x(1).unwrap();
        circ.compose(&qft(n, false).unwrap(), &sum).unwrap();
        circ.compose(&encoder.circuit().unwrap(), &(0..encoder.num_qubits()).collect::<Vec<_>>())
            .unwrap();
        circ.compose(&qft(n, true).unwrap(), &sum).unwrap();

        let probs = Statevector::from_circuit(&circ).unwrap().probabilities(&sum);
        assert!((probs[3] - 1.0).abs() < 1e-9, "{probs:?}");
    }
}
