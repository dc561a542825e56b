//! Reference execution backend.
//!
//! The estimation code only depends on the [`Backend`] trait; this module
//! ships a sparse statevector simulator that implements it by sampling shots.

pub mod backend;
pub mod statevector;

pub use backend::*;
pub use statevector::*;
