//! Input/output helpers.
//!
//! - model configuration JSON (`config`)
//! - run exports (`export`)

pub mod config;
pub mod export;

pub use config::*;
pub use export::*;
