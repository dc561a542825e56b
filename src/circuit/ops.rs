//! Operations understood by the circuit value object.
//!
//! Qubit indices are absolute within the owning circuit. Registers are ordered
//! least-significant qubit first, so a register `[q0, q1, q2]` holding the
//! integer `x` has bit `i` of `x` on qubit `q_i`.

use serde::{Deserialize, Serialize};

/// A control condition: the operation fires only when `qubit` reads `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub qubit: usize,
    pub state: bool,
}

impl Control {
    pub fn on(qubit: usize) -> Self {
        Self { qubit, state: true }
    }

    pub fn off(qubit: usize) -> Self {
        Self {
            qubit,
            state: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    H {
        target: usize,
    },
    X {
        target: usize,
    },
    Z {
        target: usize,
    },
    Ry {
        target: usize,
        theta: f64,
    },
    /// `diag(1, e^{iλ})`.
    Phase {
        target: usize,
        lambda: f64,
    },
    /// `RY(angles[x])` on `target`, where `x` is the value held by `register`.
    RegisterRy {
        register: Vec<usize>,
        target: usize,
        angles: Vec<f64>,
    },
    /// Fourier transform without the trailing qubit reversal.
    Qft {
        register: Vec<usize>,
        inverse: bool,
    },
    /// `sum ± Σ weights[i]·inputs[i]` modulo `2^|sum|`.
    WeightedSum {
        inputs: Vec<usize>,
        weights: Vec<u64>,
        sum: Vec<usize>,
        subtract: bool,
    },
    /// Flips `result` when `x >= value` (`geq`) or `x < value` (`!geq`).
    Compare {
        register: Vec<usize>,
        value: u64,
        geq: bool,
        result: usize,
    },
    /// Negates the amplitude of the all-zero state of `qubits`.
    ReflectZero {
        qubits: Vec<usize>,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::H { .. } => "h",
            Operation::X { .. } => "x",
            Operation::Z { .. } => "z",
            Operation::Ry { .. } => "ry",
            Operation::Phase { .. } => "p",
            Operation::RegisterRy { .. } => "register_ry",
            Operation::Qft { inverse: false, .. } => "qft",
            Operation::Qft { inverse: true, .. } => "iqft",
            Operation::WeightedSum { .. } => "weighted_sum",
            Operation::Compare { .. } => "compare",
            Operation::ReflectZero { .. } => "reflect_zero",
        }
    }

    /// All qubits the operation touches (excluding controls).
    pub fn qubits(&self) -> Vec<usize> {
        match self {
            Operation::H { target }
            | Operation::X { target }
            | Operation::Z { target }
            | Operation::Ry { target, .. }
            | Operation::Phase { target, .. } => vec![*target],
            Operation::RegisterRy {
                register, target, ..
            } => {
                let mut out = register.clone();
                out.push(*target);
                out
            }
            Operation::Qft { register, .. } => register.clone(),
            Operation::WeightedSum { inputs, sum, .. } => {
                inputs.iter().chain(sum.iter()).copied().collect()
            }
            Operation::Compare {
                register, result, ..
            } => {
                let mut out = register.clone();
                out.push(*result);
                out
            }
            Operation::ReflectZero { qubits } => qubits.clone(),
        }
    }

    pub fn inverse(&self) -> Operation {
        match self {
            Operation::Ry { target, theta } => Operation::Ry {
                target: *target,
                theta: -theta,
            },
            Operation::Phase { target, lambda } => Operation::Phase {
                target: *target,
                lambda: -lambda,
            },
            Operation::RegisterRy {
                register,
                target,
                angles,
            } => Operation::RegisterRy {
                register: register.clone(),
                target: *target,
                angles: angles.iter().map(|a| -a).collect(),
            },
            Operation::Qft { register, inverse } => Operation::Qft {
                register: register.clone(),
                inverse: !inverse,
            },
            Operation::WeightedSum {
                inputs,
                weights,
                sum,
                subtract,
            } => Operation::WeightedSum {
                inputs: inputs.clone(),
                weights: weights.clone(),
                sum: sum.clone(),
                subtract: !subtract,
            },
            // Self-inverse.
            other => other.clone(),
        }
    }

    /// Rewrite every qubit index through `map`.
    pub fn remap(&self, map: impl Fn(usize) -> usize) -> Operation {
        let all = |qs: &[usize]| qs.iter().map(|&q| map(q)).collect::<Vec<_>>();
        match self {
            Operation::H { target } => Operation::H {
                target: map(*target),
            },
            Operation::X { target } => Operation::X {
                target: map(*target),
            },
            Operation::Z { target } => Operation::Z {
                target: map(*target),
            },
            Operation::Ry { target, theta } => Operation::Ry {
                target: map(*target),
                theta: *theta,
            },
            Operation::Phase { target, lambda } => Operation::Phase {
                target: map(*target),
                lambda: *lambda,
            },
            Operation::RegisterRy {
                register,
                target,
                angles,
            } => Operation::RegisterRy {
                register: all(register),
                target: map(*target),
                angles: angles.clone(),
            },
            Operation::Qft { register, inverse } => Operation::Qft {
                register: all(register),
                inverse: *inverse,
            },
            Operation::WeightedSum {
                inputs,
                weights,
                sum,
                subtract,
            } => Operation::WeightedSum {
                inputs: all(inputs),
                weights: weights.clone(),
                sum: all(sum),
                subtract: *subtract,
            },
            Operation::Compare {
                register,
                value,
                geq,
                result,
            } => Operation::Compare {
                register: all(register),
                value: *value,
                geq: *geq,
                result: map(*result),
            },
            Operation::ReflectZero { qubits } => Operation::ReflectZero {
                qubits: all(qubits),
            },
        }
    }

    /// Structural checks that do not depend on the owning circuit.
    pub(crate) fn shape_error(&self) -> Option<String> {
        match self {
            Operation::RegisterRy {
                register, angles, ..
            } => {
                let expected = 1usize.checked_shl(register.len() as u32).unwrap_or(0);
                (angles.len() != expected).then(|| {
                    format!(
                        "register_ry over {} qubits needs {expected} angles, got {}",
                        register.len(),
                        angles.len()
                    )
                })
            }
            Operation::Qft { register, .. } if register.is_empty() => {
                Some("qft needs a non-empty register".to_string())
            }
            Operation::WeightedSum {
                inputs,
                weights,
                sum,
                ..
            } => {
                if inputs.len() != weights.len() {
                    Some(format!(
                        "weighted_sum has {} inputs but {} weights",
                        inputs.len(),
                        weights.len()
                    ))
                } else if sum.is_empty() {
                    Some("weighted_sum needs a non-empty sum register".to_string())
                } else {
                    None
                }
            }
            Operation::Compare { register, .. } if register.is_empty() => {
                Some("compare needs a non-empty register".to_string())
            }
            _ => None,
        }
    }
}

/// An operation plus the controls gating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Operation,
    pub controls: Vec<Control>,
}

impl Instruction {
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            controls: Vec::new(),
        }
    }

    pub fn controlled(op: Operation, controls: Vec<Control>) -> Self {
        Self { op, controls }
    }

    pub fn inverse(&self) -> Self {
        Self {
            op: self.op.inverse(),
            controls: self.controls.clone(),
        }
    }

    pub fn remap(&self, map: impl Fn(usize) -> usize + Copy) -> Self {
        Self {
            op: self.op.remap(map),
            controls: self
                .controls
                .iter()
                .map(|c| Control {
                    qubit: map(c.qubit),
                    state: c.state,
                })
                .collect(),
        }
    }

    /// Target qubits followed by control qubits.
    pub fn all_qubits(&self) -> Vec<usize> {
        let mut out = self.op.qubits();
        out.extend(self.controls.iter().map(|c| c.qubit));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_negates_rotations_and_toggles_transforms() {
        let ry = Operation::Ry {
            target: 0,
            theta: 0.3,
        };
        assert_eq!(
            ry.inverse(),
            Operation::Ry {
                target: 0,
                theta: -0.3
            }
        );
        let qft = Operation::Qft {
            register: vec![0, 1],
            inverse: false,
        };
        assert_eq!(qft.inverse().name(), "iqft");
        let cmp = Operation::Compare {
            register: vec![0],
            value: 1,
            geq: true,
            result: 1,
        };
        assert_eq!(cmp.inverse(), cmp);
    }

    #[test]
    fn remap_moves_targets_and_controls() {
        let instr = Instruction::controlled(
            Operation::Phase {
                target: 1,
                lambda: 0.5,
            },
            vec![Control::off(0)],
        );
        let moved = instr.remap(|q| q + 10);
        assert_eq!(moved.all_qubits(), vec![11, 10]);
        assert!(!moved.controls[0].state);
    }

    #[test]
    fn register_ry_angle_count_is_checked() {
        let op = Operation::RegisterRy {
            register: vec![0, 1],
            target: 2,
            angles: vec![0.0; 3],
        };
        assert!(op.shape_error().is_some());
    }
}
