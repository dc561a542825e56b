use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Binomial, Distribution};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::circuit::Circuit;
use crate::domain::Counts;
use crate::error::AppError;
use crate::sim::Statevector;

/// Something that can execute measured circuits and return shot counts.
///
/// Results are positional: `counts[i]` belongs to `circuits[i]`.
pub trait Backend: Sync {
    fn name(&self) -> &str;

    fn run(&self, circuits: &[Circuit], shots: u64) -> Result<Vec<Counts>, AppError>;
}

/// Samples shots from exact statevector probabilities.
///
/// Circuit `i` draws from `StdRng::seed_from_u64(seed + i)`, so a run is
/// reproducible regardless of how rayon schedules the circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatevectorSampler {
    pub seed: u64,
}

impl StatevectorSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn sample(&self, index: usize, circuit: &Circuit, shots: u64) -> Result<Counts, AppError> {
        let measured = circuit.measured();
        if measured.is_empty() {
            return Err(AppError::layout(format!(
                "Circuit '{}' measures no qubits.",
                circuit.name()
            )));
        }
        let state = Statevector::from_circuit(circuit)?;
        let marginal = state.marginal(measured);
        debug!(
            circuit = circuit.name(),
            support = state.support_len(),
            outcomes = marginal.len(),
            "statevector ready"
        );

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));
        Ok(multinomial(&marginal, shots, measured.len(), &mut rng))
    }
}

impl Default for StatevectorSampler {
    fn default() -> Self {
        Self::new(42)
    }
}

impl Backend for StatevectorSampler {
    fn name(&self) -> &str {
        "statevector-sampler"
    }

    fn run(&self, circuits: &[Circuit], shots: u64) -> Result<Vec<Counts>, AppError> {
        info!(circuits = circuits.len(), shots, seed = self.seed, "sampling circuits");
        circuits
            .par_iter()
            .enumerate()
            .map(|(index, circuit)| self.sample(index, circuit, shots))
            .collect()
    }
}

/// Split `shots` across outcomes with sequential conditional binomials.
fn multinomial(
    marginal: &std::collections::BTreeMap<u64, f64>,
    shots: u64,
    width: usize,
    rng: &mut StdRng,
) -> Counts {
    let mut counts = Counts::new();
    let mut remaining_shots = shots;
    let mut remaining_mass: f64 = marginal.values().sum();
    let last = marginal.len().saturating_sub(1);

    for (i, (&value, &p)) in marginal.iter().enumerate() {
        if remaining_shots == 0 {
            break;
        }
        let drawn = if i == last || remaining_mass <= 0.0 {
            remaining_shots
        } else {
            let q = (p / remaining_mass).clamp(0.0, 1.0);
            match Binomial::new(remaining_shots, q) {
                Ok(dist) => dist.sample(rng),
                Err(_) => 0,
            }
        };
        remaining_mass -= p;
        remaining_shots -= drawn;
        if drawn > 0 {
            counts.insert(bitstring(value, width), drawn);
        }
    }
    counts
}

/// Classical bit 0 is the rightmost character.
pub fn bitstring(value: u64, width: usize) -> String {
    (0..width)
        .rev()
        .map(|bit| if (value >> bit) & 1 == 1 { '1' } else { '0' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitstring_puts_first_bit_rightmost() {
        assert_eq!(bitstring(0b001, 3), "001");
        assert_eq!(bitstring(0b110, 3), "110");
        assert_eq!(bitstring(1, 1), "1");
    }

    #[test]
    fn deterministic_circuit_gets_every_shot() {
        let mut circuit = Circuit::new("x", 2);
        circuit.x(1).unwrap();
        circuit.measure(&[0, 1]).unwrap();
        let counts = StatevectorSampler::new(7).run(&[circuit], 100).unwrap();
        assert_eq!(counts[0].get("10"), Some(&100));
        assert_eq!(counts[0].len(), 1);
    }

    #[test]
    fn sampling_is_reproducible_and_roughly_fair() {
        let mut circuit = Circuit::new("h", 1);
        circuit.h(0).unwrap();
        circuit.measure(&[0]).unwrap();
        let sampler = StatevectorSampler::new(3);
        let a = sampler.run(&[circuit.clone(), circuit.clone()], 10_000).unwrap();
        let b = sampler.run(&[circuit.clone(), circuit], 10_000).unwrap();
        assert_eq!(a, b);
        let ones = *a[0].get("1").unwrap_or(&0);
        let zeros = *a[0].get("0").unwrap_or(&0);
        assert_eq!(ones + zeros, 10_000);
        assert!((ones as f64 / 10_000.0 - 0.5).abs() < 0.03);
    }

    #[test]
    fn unmeasured_circuit_is_rejected() {
        let circuit = Circuit::new("bare", 1);
        let err = StatevectorSampler::default().run(&[circuit], 10).unwrap_err();
        assert!(err.message().contains("measures no qubits"));
    }
}
