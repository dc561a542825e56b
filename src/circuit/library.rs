//! Arithmetic building blocks consumed by the risk models.
//!
//! Only the observable contract of each block is modelled: the register
//! layout it expects, the ancillas it reserves, and its action on basis
//! states. Gate-level decompositions are left to whatever backend lowers the
//! circuit.

use std::f64::consts::{FRAC_PI_4, PI};

use crate::circuit::{Circuit, Operation};
use crate::error::AppError;
use crate::math::normal_pdf;

/// Fourier transform over `width` qubits (no trailing swaps).
pub fn qft(width: usize, inverse: bool) -> Result<Circuit, AppError> {
    let name = if inverse { "IQFT" } else { "QFT" };
    let mut circ = Circuit::new(name, width);
    circ.apply(Operation::Qft {
        register: (0..width).collect(),
        inverse,
    })?;
    Ok(circ)
}

/// Add the constant `value` to a register that is in the Fourier basis.
///
/// Qubit `i` receives the phase `value·π·2^(fractional_precision − i)`; after
/// the inverse transform the register holds `value·2^fractional_precision`
/// (mod `2^width`).
pub fn phase_adder(width: usize, value: f64, fractional_precision: u32) -> Result<Circuit, AppError> {
    let mut circ = Circuit::new("add_value", width);
    for i in 0..width {
        let lambda = value * PI * 2f64.powi(fractional_precision as i32 - i as i32);
        circ.p(lambda, i)?;
    }
    Ok(circ)
}

/// `|q⟩|0⟩ ↦ |q⟩|Σ w_i q_i⟩`.
///
/// Layout: `[state (n) | sum (s) | carry (s−1) | control (0 or 1)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAdder {
    weights: Vec<u64>,
}

impl WeightedAdder {
    pub fn new(weights: &[u64]) -> Result<Self, AppError> {
        if weights.is_empty() {
            return Err(AppError::invalid("weights", "must contain at least one entry"));
        }
        if weights.iter().try_fold(0u64, |acc, w| acc.checked_add(*w)).is_none() {
            return Err(AppError::invalid("weights", format!("must sum to at most {}", u64::MAX)));
        }
        Ok(Self {
            weights: weights.to_vec(),
        })
    }

    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    pub fn num_state_qubits(&self) -> usize {
        self.weights.len()
    }

    /// Enough qubits to hold `Σ weights` without overflow.
    pub fn num_sum_qubits(&self) -> usize {
        let total: u64 = self.weights.iter().sum();
        if total > 0 {
            (u64::BITS - total.leading_zeros()) as usize
        } else {
            1
        }
    }

    pub fn num_carry_qubits(&self) -> usize {
        self.num_sum_qubits() - 1
    }

    pub fn num_control_qubits(&self) -> usize {
        usize::from(self.num_sum_qubits() > 2)
    }

    pub fn num_ancillas(&self) -> usize {
        self.num_carry_qubits() + self.num_control_qubits()
    }

    pub fn num_qubits(&self) -> usize {
        self.num_state_qubits() + self.num_sum_qubits() + self.num_ancillas()
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let n = self.num_state_qubits();
        let s = self.num_sum_qubits();
        let mut circ = Circuit::new("weighted_adder", self.num_qubits());
        circ.apply(Operation::WeightedSum {
            inputs: (0..n).collect(),
            weights: self.weights.clone(),
            sum: (n..n + s).collect(),
            subtract: false,
        })?;
        Ok(circ)
    }
}

/// Writes `x >= value` (or `x < value`) into a result qubit.
///
/// Layout: `[state (n) | result | ancillas (n−1)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerComparator {
    num_state_qubits: usize,
    value: u64,
    geq: bool,
}

impl IntegerComparator {
    pub fn new(num_state_qubits: usize, value: u64, geq: bool) -> Result<Self, AppError> {
        if num_state_qubits == 0 {
            return Err(AppError::invalid("comparator width", "must be >= 1"));
        }
        Ok(Self {
            num_state_qubits,
            value,
            geq,
        })
    }

    pub fn num_state_qubits(&self) -> usize {
        self.num_state_qubits
    }

    pub fn num_ancillas(&self) -> usize {
        self.num_state_qubits - 1
    }

    pub fn num_qubits(&self) -> usize {
        2 * self.num_state_qubits
    }

    pub fn result_qubit(&self) -> usize {
        self.num_state_qubits
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let mut circ = Circuit::new("comparator", self.num_qubits());
        circ.apply(Operation::Compare {
            register: (0..self.num_state_qubits).collect(),
            value: self.value,
            geq: self.geq,
            result: self.num_state_qubits,
        })?;
        Ok(circ)
    }
}

/// `|x⟩|0⟩ ↦ |x⟩ RY(p(x))|0⟩` for a polynomial `p` (coefficients lowest order first).
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialRotation {
    num_state_qubits: usize,
    coeffs: Vec<f64>,
}

impl PolynomialRotation {
    pub fn new(num_state_qubits: usize, coeffs: Vec<f64>) -> Self {
        Self {
            num_state_qubits,
            coeffs,
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn num_qubits(&self) -> usize {
        self.num_state_qubits + 1
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let n = self.num_state_qubits;
        let angles = (0..1usize << n).map(|x| self.eval(x as f64)).collect();
        let mut circ = Circuit::new("poly_ry", n + 1);
        circ.apply(Operation::RegisterRy {
            register: (0..n).collect(),
            target: n,
            angles,
        })?;
        Ok(circ)
    }
}

/// Piecewise linear function encoded into the amplitude of a target qubit.
///
/// On `[breakpoint_i, breakpoint_{i+1})` the function is
/// `slope_i·(x − breakpoint_i) + offset_i`. Values are rescaled around `π/4`
/// by `rescaling_factor` so that `P(target = 1)` is approximately affine in the
/// function value; [`LinearAmplitudeFunction::post_processing`] undoes this.
///
/// Layout: `[state (n) | target | ancillas (n if more than one breakpoint)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearAmplitudeFunction {
    num_state_qubits: usize,
    image: (f64, f64),
    rescaling_factor: f64,
    mapped_breakpoints: Vec<f64>,
    slope_angles: Vec<f64>,
    offset_angles: Vec<f64>,
}

impl LinearAmplitudeFunction {
    pub fn new(
        num_state_qubits: usize,
        slopes: &[f64],
        offsets: &[f64],
        domain: (f64, f64),
        image: (f64, f64),
        breakpoints: &[f64],
        rescaling_factor: f64,
    ) -> Result<Self, AppError> {
        if num_state_qubits == 0 {
            return Err(AppError::invalid("payoff width", "must be >= 1"));
        }
        if slopes.len() != offsets.len() || slopes.len() != breakpoints.len() {
            return Err(AppError::invalid(
                "breakpoints",
                format!(
                    "slopes ({}), offsets ({}) and breakpoints ({}) must have equal length",
                    slopes.len(),
                    offsets.len(),
                    breakpoints.len()
                ),
            ));
        }
        let (a, b) = domain;
        let (c, d) = image;
        if !(b > a) {
            return Err(AppError::invalid("domain", format!("({a}, {b}) must be increasing")));
        }
        if !(d > c) {
            return Err(AppError::invalid("image", format!("({c}, {d}) must be increasing")));
        }
        if !(rescaling_factor > 0.0 && rescaling_factor <= 1.0) {
            return Err(AppError::invalid(
                "c_approx",
                format!("must lie in (0, 1], got {rescaling_factor}"),
            ));
        }
        if breakpoints.windows(2).any(|w| w[1] < w[0])
            || breakpoints.iter().any(|&p| p < a || p > b)
        {
            return Err(AppError::invalid(
                "breakpoints",
                format!("{breakpoints:?} must be ascending and inside the domain ({a}, {b})"),
            ));
        }

        // The first interval always starts at the domain's lower end.
        let mut points = breakpoints.to_vec();
        let mut slopes = slopes.to_vec();
        let mut offsets = offsets.to_vec();
        if points.first().is_none_or(|&p| p > a + 1e-12) {
            points.insert(0, a);
            slopes.insert(0, 0.0);
            offsets.insert(0, 0.0);
        }

        let scale = (b - a) / ((1u64 << num_state_qubits) as f64 - 1.0);
        let mapped_breakpoints: Vec<f64> = points.iter().map(|p| (p - a) / scale).collect();

        let slope_angles = slopes
            .iter()
            .map(|s| PI * rescaling_factor * (s * scale) / 2.0 / (d - c))
            .collect();
        let offset_angles = offsets
            .iter()
            .map(|o| FRAC_PI_4 * (1.0 - rescaling_factor) + PI * rescaling_factor * (o - c) / 2.0 / (d - c))
            .collect();

        Ok(Self {
            num_state_qubits,
            image,
            rescaling_factor,
            mapped_breakpoints,
            slope_angles,
            offset_angles,
        })
    }

    pub fn num_state_qubits(&self) -> usize {
        self.num_state_qubits
    }

    pub fn num_ancillas(&self) -> usize {
        if self.mapped_breakpoints.len() > 1 {
            self.num_state_qubits
        } else {
            0
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_state_qubits + 1 + self.num_ancillas()
    }

    /// Full `RY` angle applied for register value `x`.
    pub fn angle(&self, x: u64) -> f64 {
        let x = x as f64;
        let Some(k) = self.mapped_breakpoints.iter().rposition(|&p| x >= p - 1e-9) else {
            return 0.0;
        };
        2.0 * (self.slope_angles[k] * (x - self.mapped_breakpoints[k]) + self.offset_angles[k])
    }

    /// Map an estimated `P(target = 1)` back into function units.
    pub fn post_processing(&self, scaled_value: f64) -> f64 {
        let c = self.rescaling_factor;
        let mut value = scaled_value - 0.5 + FRAC_PI_4 * c;
        value *= 2.0 / PI / c;
        value *= self.image.1 - self.image.0;
        value + self.image.0
    }

    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let n = self.num_state_qubits;
        let angles = (0..1u64 << n).map(|x| self.angle(x)).collect();
        let mut circ = Circuit::new("payoff", self.num_qubits());
        circ.apply(Operation::RegisterRy {
            register: (0..n).collect(),
            target: n,
            angles,
        })?;
        Ok(circ)
    }
}

/// Discretised normal distribution loaded into amplitudes.
///
/// Grid points are `linspace(low, high, 2^n)`; probabilities are the density
/// at each point (with `variance`, not standard deviation) normalised to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalDistribution {
    num_qubits: usize,
    probabilities: Vec<f64>,
}

impl NormalDistribution {
    pub fn new(num_qubits: usize, mu: f64, variance: f64, bounds: (f64, f64)) -> Result<Self, AppError> {
        if num_qubits == 0 {
            return Err(AppError::invalid("z_qubits", "must be >= 1"));
        }
        if !(variance > 0.0) {
            return Err(AppError::invalid("variance", format!("must be > 0, got {variance}")));
        }
        let (low, high) = bounds;
        let points = crate::math::lin_space(low, high, 1usize << num_qubits)?;
        let density: Vec<f64> = points.iter().map(|&x| normal_pdf(x, mu, variance)).collect();
        let total: f64 = density.iter().sum();
        if !(total > 0.0) {
            return Err(AppError::invalid("bounds", "carry no probability mass"));
        }
        Ok(Self {
            num_qubits,
            probabilities: density.into_iter().map(|p| p / total).collect(),
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Cascade of register-controlled `RY`s, most significant qubit first.
    pub fn circuit(&self) -> Result<Circuit, AppError> {
        let n = self.num_qubits;
        let mut circ = Circuit::new("normal", n);
        for level in (0..n).rev() {
            let higher: Vec<usize> = (level + 1..n).collect();
            let mut angles = Vec::with_capacity(1 << higher.len());
            for prefix in 0..1usize << higher.len() {
                let (mut p0, mut p1) = (0.0, 0.0);
                for (x, p) in self.probabilities.iter().enumerate() {
                    if x >> (level + 1) != prefix {
                        continue;
                    }
                    if (x >> level) & 1 == 1 {
                        p1 += p;
                    } else {
                        p0 += p;
                    }
                }
                angles.push(2.0 * f64::atan2(f64::sqrt(p1), f64::sqrt(p0)));
            }
            circ.apply(Operation::RegisterRy {
                register: higher,
                target: level,
                angles,
            })?;
        }
        Ok(circ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_adder_widths() {
        let adder = WeightedAdder::new(&[1, 2]).unwrap();
        assert_eq!(adder.num_sum_qubits(), 2);
        assert_eq!(adder.num_ancillas(), 1);
        assert_eq!(adder.num_qubits(), 5);

        let wide = WeightedAdder::new(&[3, 4, 5]).unwrap();
        assert_eq!(wide.num_sum_qubits(), 4);
        assert_eq!(wide.num_ancillas(), 4);

        let err = WeightedAdder::new(&[u64::MAX, 1]).unwrap_err();
        assert!(err.message().contains("weights"));
    }

    #[test]
    fn comparator_layout() {
        let cmp = IntegerComparator::new(3, 2, false).unwrap();
        assert_eq!(cmp.num_qubits(), 6);
        assert_eq!(cmp.num_ancillas(), 2);
        assert_eq!(cmp.result_qubit(), 3);
    }

    #[test]
    fn polynomial_rotation_evaluates_lowest_order_first() {
        let poly = PolynomialRotation::new(2, vec![0.5, 0.25]);
        assert!((poly.eval(3.0) - 1.25).abs() < 1e-15);
        assert_eq!(poly.num_qubits(), 3);
    }

    #[test]
    fn payoff_is_flat_below_strike_and_linear_above() {
        // 3 state qubits over [0, 7] so one index == one price unit.
        let f = LinearAmplitudeFunction::new(3, &[0.0, 1.0], &[0.0, 0.0], (0.0, 7.0), (0.0, 4.0), &[0.0, 3.0], 0.1)
            .unwrap();
        assert_eq!(f.num_ancillas(), 3);
        assert_eq!(f.num_qubits(), 7);
        let base = 2.0 * FRAC_PI_4 * 0.9;
        assert!((f.angle(0) - base).abs() < 1e-12);
        assert!((f.angle(2) - base).abs() < 1e-12);
        let step = f.angle(5) - f.angle(4);
        assert!(step > 0.0);
        assert!((f.angle(6) - f.angle(5) - step).abs() < 1e-12);
    }

    #[test]
    fn payoff_post_processing_inverts_small_angle_map() {
        let f = LinearAmplitudeFunction::new(3, &[0.0, 1.0], &[0.0, 0.0], (0.0, 7.0), (0.0, 4.0), &[0.0, 3.0], 0.1)
            .unwrap();
        // Zero payoff maps to sin²(π/4·(1−c)) which is ≈ 1/2 − π/4·c.
        let p0 = (f.angle(0) / 2.0).sin().powi(2);
        assert!(f.post_processing(p0).abs() < 0.01);
    }

    #[test]
    fn payoff_rejects_breakpoints_outside_domain() {
        let err = LinearAmplitudeFunction::new(3, &[0.0, 1.0], &[0.0, 0.0], (0.0, 7.0), (0.0, 4.0), &[0.0, 9.0], 0.1)
            .unwrap_err();
        assert!(err.message().contains("breakpoints"));
    }

    #[test]
    fn normal_distribution_is_normalised_and_symmetric() {
        let dist = NormalDistribution::new(3, 3.5, 1.75, (0.0, 7.0)).unwrap();
        let p = dist.probabilities();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - p[7]).abs() < 1e-12);
        assert!(p[3] > p[1]);
        assert_eq!(dist.circuit().unwrap().len(), 3);
    }
}
