//! `regime-qae` library crate.
//!
//! Quantum-circuit models of credit risk and derivative pricing under a
//! two-state Markov economy, plus maximum-likelihood amplitude estimation.
//!
//! The binary (`rq`) is a thin wrapper around this library so that:
//!
//! - circuit construction and estimation are testable without spawning processes
//! - execution backends can be swapped behind [`sim::Backend`]
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod circuit;
pub mod cli;
pub mod domain;
pub mod error;
pub mod estimation;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod sim;
