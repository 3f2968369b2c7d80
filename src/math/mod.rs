//! Numeric utilities: linear least-squares sub-solves and compensated accumulation.

pub mod ols;
pub mod sum;

pub use ols::*;
pub use sum::*;
