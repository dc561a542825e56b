//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the per-variant configuration structs (`StaticCreditRiskConfig`, ...)
//! - the Markov-chain probability pair and its derived rotation angles
//! - measurement count results

pub mod types;

pub use types::*;
