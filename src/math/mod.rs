//! Mathematical utilities: normal distribution helpers, least squares and grids.

pub mod grid;
pub mod normal;
pub mod ols;

pub use grid::*;
pub use normal::*;
pub use ols::*;
