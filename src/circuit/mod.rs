//! Circuit descriptions as plain values.
//!
//! A [`Circuit`] is an ordered list of [`Instruction`]s over a fixed number of
//! qubits. Sub-circuits are built independently and composed into larger ones
//! at explicit qubit positions; nothing is inherited or mutated after
//! composition.

pub mod builder;
pub mod library;
pub mod ops;

pub use builder::*;
pub use library::*;
pub use ops::*;
