//! Amplitude estimation on top of assembled risk circuits.
//!
//! - `problem`: state preparation, objective qubits, good-state predicate and
//!   the amplification operator derived from them
//! - `mlae`: maximum-likelihood amplitude estimation (circuits + grid search)

pub mod mlae;
pub mod problem;

pub use mlae::*;
pub use problem::*;
