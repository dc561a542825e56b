//! Qubit-range bookkeeping for assembled circuits.
//!
//! Registers are reserved back to back, so ranges can never overlap and every
//! offset is derived from the widths that components report.

use serde::Serialize;

use crate::error::AppError;

/// Half-open range `[start, start + len)` of qubit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QubitRange {
    pub start: usize,
    pub len: usize,
}

impl QubitRange {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn indices(&self) -> Vec<usize> {
        (self.start..self.end()).collect()
    }

    /// Absolute index of the `i`-th qubit in the range.
    pub fn qubit(&self, i: usize) -> Result<usize, AppError> {
        if i < self.len {
            Ok(self.start + i)
        } else {
            Err(AppError::layout(format!(
                "Insufficient register: index {i} requested from a range of {} qubits.",
                self.len
            )))
        }
    }

    pub fn last(&self) -> Result<usize, AppError> {
        match self.len {
            0 => Err(AppError::layout("Insufficient register: empty range has no last qubit.")),
            len => Ok(self.start + len - 1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterLayout {
    registers: Vec<(&'static str, QubitRange)>,
}

impl RegisterLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_qubits(&self) -> usize {
        self.registers.last().map_or(0, |(_, r)| r.end())
    }

    /// Append a register of `len` qubits.
    pub fn reserve(&mut self, name: &'static str, len: usize) -> Result<QubitRange, AppError> {
        if self.registers.iter().any(|(n, _)| *n == name) {
            return Err(AppError::layout(format!(
                "Overlapping register: '{name}' is reserved twice."
            )));
        }
        let range = QubitRange {
            start: self.num_qubits(),
            len,
        };
        self.registers.push((name, range));
        Ok(range)
    }

    pub fn range(&self, name: &str) -> Result<QubitRange, AppError> {
        self.registers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| *r)
            .ok_or_else(|| AppError::layout(format!("Register '{name}' was never reserved.")))
    }

    pub fn registers(&self) -> &[(&'static str, QubitRange)] {
        &self.registers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous() {
        let mut layout = RegisterLayout::new();
        let a = layout.reserve("markov", 4).unwrap();
        let b = layout.reserve("anc", 0).unwrap();
        let c = layout.reserve("sum", 3).unwrap();
        assert_eq!(a.indices(), vec![0, 1, 2, 3]);
        assert!(b.is_empty());
        assert_eq!(c.start, 4);
        assert_eq!(layout.num_qubits(), 7);
        assert_eq!(layout.range("sum").unwrap().last().unwrap(), 6);
    }

    #[test]
    fn duplicate_names_and_out_of_range_qubits_are_layout_errors() {
        let mut layout = RegisterLayout::new();
        layout.reserve("sum", 2).unwrap();
        let err = layout.reserve("sum", 1).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_LAYOUT);
        assert!(err.message().contains("Overlapping"));
        assert!(layout.range("carry").is_err());
        assert!(layout.range("sum").unwrap().qubit(2).is_err());
    }
}
