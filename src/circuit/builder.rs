//! The circuit value object and its composition rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::circuit::ops::{Control, Instruction, Operation};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    num_qubits: usize,
    instructions: Vec<Instruction>,
    /// Qubits read out at the end, in classical-bit order.
    measured: Vec<usize>,
}

impl Circuit {
    pub fn new(name: impl Into<String>, num_qubits: usize) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            instructions: Vec::new(),
            measured: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn measured(&self) -> &[usize] {
        &self.measured
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Operation counts keyed by operation name.
    pub fn count_ops(&self) -> BTreeMap<&'static str, usize> {
        let mut out = BTreeMap::new();
        for instr in &self.instructions {
            *out.entry(instr.op.name()).or_insert(0) += 1;
        }
        out
    }

    /// Append an instruction after checking its qubits against this circuit.
    pub fn push(&mut self, instr: Instruction) -> Result<(), AppError> {
        if let Some(msg) = instr.op.shape_error() {
            return Err(AppError::layout(format!("{}: {msg}", self.name)));
        }
        let qubits = instr.all_qubits();
        check_distinct_in_range(&self.name, self.num_qubits, &qubits)?;
        self.instructions.push(instr);
        Ok(())
    }

    pub fn apply(&mut self, op: Operation) -> Result<(), AppError> {
        self.push(Instruction::new(op))
    }

    pub fn apply_controlled(
        &mut self,
        op: Operation,
        controls: Vec<Control>,
    ) -> Result<(), AppError> {
        self.push(Instruction::controlled(op, controls))
    }

    pub fn h(&mut self, target: usize) -> Result<(), AppError> {
        self.apply(Operation::H { target })
    }

    pub fn x(&mut self, target: usize) -> Result<(), AppError> {
        self.apply(Operation::X { target })
    }

    pub fn ry(&mut self, theta: f64, target: usize) -> Result<(), AppError> {
        self.apply(Operation::Ry { target, theta })
    }

    pub fn cry(&mut self, theta: f64, control: usize, target: usize) -> Result<(), AppError> {
        self.apply_controlled(Operation::Ry { target, theta }, vec![Control::on(control)])
    }

    pub fn p(&mut self, lambda: f64, target: usize) -> Result<(), AppError> {
        self.apply(Operation::Phase { target, lambda })
    }

    /// Compose `other` into this circuit, mapping its qubit `i` onto `qubits[i]`.
    ///
    /// Fails when `qubits` has the wrong length, repeats an index, or leaves
    /// this circuit's range.
    pub fn compose(&mut self, other: &Circuit, qubits: &[usize]) -> Result<(), AppError> {
        if qubits.len() != other.num_qubits {
            return Err(AppError::layout(format!(
                "Cannot place '{}' ({} qubits) on {} qubits of '{}'.",
                other.name,
                other.num_qubits,
                qubits.len(),
                self.name
            )));
        }
        check_distinct_in_range(&self.name, self.num_qubits, qubits)?;

        self.instructions
            .extend(other.instructions.iter().map(|i| i.remap(|q| qubits[q])));
        Ok(())
    }

    /// Compose `other` onto the contiguous range starting at `offset`.
    pub fn compose_at(&mut self, other: &Circuit, offset: usize) -> Result<(), AppError> {
        let qubits: Vec<usize> = (offset..offset + other.num_qubits).collect();
        self.compose(other, &qubits)
    }

    /// Controlled version of this circuit.
    ///
    /// The result has `ctrl_state.len()` extra leading qubits; qubit `i` of the
    /// result gates on `ctrl_state[i]`, and the circuit's own qubits follow.
    pub fn controlled(&self, ctrl_state: &[bool]) -> Circuit {
        let shift = ctrl_state.len();
        let controls: Vec<Control> = ctrl_state
            .iter()
            .enumerate()
            .map(|(qubit, &state)| Control { qubit, state })
            .collect();

        let instructions = self
            .instructions
            .iter()
            .map(|instr| {
                let mut moved = instr.remap(|q| q + shift);
                moved.controls.extend(controls.iter().copied());
                moved
            })
            .collect();

        Circuit {
            name: format!("c_{}", self.name),
            num_qubits: self.num_qubits + shift,
            instructions,
            measured: Vec::new(),
        }
    }

    /// Adjoint: reversed order, each instruction inverted.
    pub fn inverse(&self) -> Circuit {
        Circuit {
            name: format!("{}_dg", self.name),
            num_qubits: self.num_qubits,
            instructions: self.instructions.iter().rev().map(Instruction::inverse).collect(),
            measured: Vec::new(),
        }
    }

    /// `k` repetitions of this circuit.
    pub fn power(&self, k: usize) -> Circuit {
        let mut instructions = Vec::with_capacity(self.instructions.len() * k);
        for _ in 0..k {
            instructions.extend(self.instructions.iter().cloned());
        }
        Circuit {
            name: format!("{}^{k}", self.name),
            num_qubits: self.num_qubits,
            instructions,
            measured: Vec::new(),
        }
    }

    /// Read out `qubits` at the end of the circuit (classical bit `i` <- `qubits[i]`).
    pub fn measure(&mut self, qubits: &[usize]) -> Result<(), AppError> {
        check_distinct_in_range(&self.name, self.num_qubits, qubits)?;
        self.measured = qubits.to_vec();
        Ok(())
    }
}

fn check_distinct_in_range(name: &str, num_qubits: usize, qubits: &[usize]) -> Result<(), AppError> {
    for (i, &q) in qubits.iter().enumerate() {
        if q >= num_qubits {
            return Err(AppError::layout(format!(
                "Qubit {q} is outside '{name}' ({num_qubits} qubits)."
            )));
        }
        if qubits[..i].contains(&q) {
            return Err(AppError::layout(format!(
                "Overlapping register: qubit {q} is used twice in '{name}'."
            )));
        }
    }
    Ok(())
}
