//! Sparse statevector simulation.
//!
//! Amplitudes are stored in a `BTreeMap` keyed by basis index (bit `q` of the
//! key is qubit `q`). Risk circuits keep most ancillas at |0⟩, so the support
//! is far smaller than `2^num_qubits`. Ordered storage keeps summation order,
//! and therefore sampled counts, deterministic.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;

use crate::circuit::{Circuit, Control, Instruction, Operation};
use crate::error::AppError;

/// Amplitudes with squared magnitude below this are dropped.
const PRUNE_EPS: f64 = 1e-26;

/// Widest register addressable by a `u64` basis index.
pub const MAX_QUBITS: usize = 64;

type Matrix2 = [[Complex64; 2]; 2];

#[derive(Debug, Clone)]
pub struct Statevector {
    num_qubits: usize,
    amplitudes: BTreeMap<u64, Complex64>,
}

impl Statevector {
    /// `|0…0⟩` on `num_qubits` qubits.
    pub fn zero(num_qubits: usize) -> Result<Self, AppError> {
        if num_qubits > MAX_QUBITS {
            return Err(AppError::layout(format!(
                "Circuit has {num_qubits} qubits; the statevector backend supports at most {MAX_QUBITS}."
            )));
        }
        let mut amplitudes = BTreeMap::new();
        amplitudes.insert(0, Complex64::new(1.0, 0.0));
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// Simulate `circuit` from `|0…0⟩`.
    pub fn from_circuit(circuit: &Circuit) -> Result<Self, AppError> {
        let mut state = Self::zero(circuit.num_qubits())?;
        state.evolve(circuit)?;
        Ok(state)
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of basis states with non-negligible amplitude.
    pub fn support_len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn amplitude(&self, index: u64) -> Complex64 {
        self.amplitudes.get(&index).copied().unwrap_or_default()
    }

    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.values().map(|a| a.norm_sqr()).sum()
    }

    pub fn evolve(&mut self, circuit: &Circuit) -> Result<(), AppError> {
        if circuit.num_qubits() != self.num_qubits {
            return Err(AppError::layout(format!(
                "Circuit '{}' has {} qubits but the state has {}.",
                circuit.name(),
                circuit.num_qubits(),
                self.num_qubits
            )));
        }
        for instr in circuit.instructions() {
            self.apply(instr);
        }
        Ok(())
    }

    /// Marginal distribution of `qubits` (outcome bit `i` is `qubits[i]`).
    pub fn probabilities(&self, qubits: &[usize]) -> Vec<f64> {
        let mut out = vec![0.0; 1usize << qubits.len()];
        for (&k, amp) in &self.amplitudes {
            out[register_value(k, qubits) as usize] += amp.norm_sqr();
        }
        out
    }

    /// Sparse marginal of `qubits`, keyed by register value.
    pub fn marginal(&self, qubits: &[usize]) -> BTreeMap<u64, f64> {
        let mut out = BTreeMap::new();
        for (&k, amp) in &self.amplitudes {
            *out.entry(register_value(k, qubits)).or_insert(0.0) += amp.norm_sqr();
        }
        out
    }

    pub fn apply(&mut self, instr: &Instruction) {
        let controls = instr.controls.as_slice();
        match &instr.op {
            Operation::H { target } => {
                let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
                self.apply_single(*target, controls, |_| [[h, h], [h, -h]]);
            }
            Operation::X { target } => {
                let bit = 1u64 << *target;
                self.apply_permutation(controls, |k| k ^ bit);
            }
            Operation::Z { target } => {
                let bit = 1u64 << *target;
                self.apply_diagonal(controls, |k| sign_if(k & bit != 0));
            }
            Operation::Ry { target, theta } => {
                let m = ry_matrix(*theta);
                self.apply_single(*target, controls, |_| m);
            }
            Operation::Phase { target, lambda } => {
                let bit = 1u64 << *target;
                let phase = Complex64::from_polar(1.0, *lambda);
                self.apply_diagonal(controls, |k| {
                    if k & bit != 0 { phase } else { Complex64::new(1.0, 0.0) }
                });
            }
            Operation::RegisterRy {
                register,
                target,
                angles,
            } => {
                let matrices: Vec<Matrix2> = angles.iter().map(|&a| ry_matrix(a)).collect();
                self.apply_single(*target, controls, |k| {
                    matrices[register_value(k, register) as usize]
                });
            }
            Operation::Qft { register, inverse } => self.apply_qft(register, *inverse, controls),
            Operation::WeightedSum {
                inputs,
                weights,
                sum,
                subtract,
            } => {
                let modulus_mask = mask_of_width(sum.len());
                self.apply_permutation(controls, |k| {
                    let total: u64 = inputs
                        .iter()
                        .zip(weights)
                        .filter(|(q, _)| k >> **q & 1 == 1)
                        .fold(0u64, |acc, (_, w)| acc.wrapping_add(*w));
                    let current = register_value(k, sum);
                    let next = if *subtract {
                        current.wrapping_sub(total)
                    } else {
                        current.wrapping_add(total)
                    } & modulus_mask;
                    write_register(k, sum, next)
                });
            }
            Operation::Compare {
                register,
                value,
                geq,
                result,
            } => {
                let bit = 1u64 << *result;
                self.apply_permutation(controls, |k| {
                    let x = register_value(k, register);
                    if (x >= *value) == *geq { k ^ bit } else { k }
                });
            }
            Operation::ReflectZero { qubits } => {
                let mask = qubits.iter().fold(0u64, |m, q| m | 1u64 << q);
                self.apply_diagonal(controls, |k| sign_if(k & mask == 0));
            }
        }
    }

    fn apply_single(&mut self, target: usize, controls: &[Control], matrix: impl Fn(u64) -> Matrix2) {
        let bit = 1u64 << target;
        let mut out: BTreeMap<u64, Complex64> = BTreeMap::new();
        for (&k, &amp) in &self.amplitudes {
            if !controls_hold(k, controls) {
                *out.entry(k).or_default() += amp;
                continue;
            }
            let m = matrix(k);
            let col = usize::from(k & bit != 0);
            *out.entry(k & !bit).or_default() += m[0][col] * amp;
            *out.entry(k | bit).or_default() += m[1][col] * amp;
        }
        self.replace(out);
    }

    fn apply_permutation(&mut self, controls: &[Control], f: impl Fn(u64) -> u64) {
        let mut out: BTreeMap<u64, Complex64> = BTreeMap::new();
        for (&k, &amp) in &self.amplitudes {
            let dest = if controls_hold(k, controls) { f(k) } else { k };
            *out.entry(dest).or_default() += amp;
        }
        self.replace(out);
    }

    fn apply_diagonal(&mut self, controls: &[Control], f: impl Fn(u64) -> Complex64) {
        for (&k, amp) in self.amplitudes.iter_mut() {
            if controls_hold(k, controls) {
                *amp *= f(k);
            }
        }
    }

    /// Forward: `|x⟩ ↦ 2^{-n/2} Σ_y e^{2πi·x·rev(y)/N}|y⟩`; inverse is the adjoint.
    ///
    /// Applied as Hadamard and controlled-phase layers, so each layer costs one
    /// pass over the support instead of a dense `N × N` transform.
    fn apply_qft(&mut self, register: &[usize], inverse: bool, controls: &[Control]) {
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let hadamard = [[h, h], [h, -h]];
        let n = register.len();
        if inverse {
            for j in 0..n {
                for k in 0..j {
                    let lambda = -PI * 2f64.powi(k as i32 - j as i32);
                    self.apply_controlled_phase(register[j], register[k], lambda, controls);
                }
                self.apply_single(register[j], controls, |_| hadamard);
            }
        } else {
            for j in (0..n).rev() {
                self.apply_single(register[j], controls, |_| hadamard);
                for k in (0..j).rev() {
                    let lambda = PI * 2f64.powi(k as i32 - j as i32);
                    self.apply_controlled_phase(register[j], register[k], lambda, controls);
                }
            }
        }
    }

    /// `e^{iλ}` on basis states where both `a` and `b` read `|1⟩`.
    fn apply_controlled_phase(&mut self, a: usize, b: usize, lambda: f64, controls: &[Control]) {
        let mask = 1u64 << a | 1u64 << b;
        let phase = Complex64::from_polar(1.0, lambda);
        self.apply_diagonal(controls, |k| {
            if k & mask == mask { phase } else { Complex64::new(1.0, 0.0) }
        });
    }

    fn replace(&mut self, mut out: BTreeMap<u64, Complex64>) {
        out.retain(|_, a| a.norm_sqr() > PRUNE_EPS);
        self.amplitudes = out;
    }
}

fn ry_matrix(theta: f64) -> Matrix2 {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new((theta / 2.0).sin(), 0.0);
    [[c, -s], [s, c]]
}

fn sign_if(negate: bool) -> Complex64 {
    Complex64::new(if negate { -1.0 } else { 1.0 }, 0.0)
}

fn controls_hold(k: u64, controls: &[Control]) -> bool {
    controls.iter().all(|c| (k >> c.qubit & 1 == 1) == c.state)
}

/// Integer held by `register` in basis state `k` (LSB first).
pub fn register_value(k: u64, register: &[usize]) -> u64 {
    register
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &q)| acc | ((k >> q) & 1) << i)
}

fn write_register(k: u64, register: &[usize], value: u64) -> u64 {
    register.iter().enumerate().fold(k, |acc, (i, &q)| {
        let bit = 1u64 << q;
        if (value >> i) & 1 == 1 { acc | bit } else { acc & !bit }
    })
}

fn mask_of_width(width: usize) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}
