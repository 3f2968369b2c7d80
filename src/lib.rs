//! `curvefit` library crate.
//!
//! A heuristic multi-start engine for nonlinear curve fitting: given a family
//! of parametric unary functions and a table of `(x, y)` observations, find a
//! parameter vector minimizing the weighted root-mean-square residual.
//!
//! The crate is a pure in-process computation with no I/O surface so that:
//!
//! - core logic is testable without external data
//! - a surrounding pipeline can run many independent fits concurrently
//! - optimizers stay swappable behind narrow interfaces
//!
//! Module map:
//!
//! - `domain`: sample table, configuration, and result types
//! - `models`: parametric function families and guess strategies
//! - `math`: least-squares sub-solves and compensated accumulation
//! - `solvers`: pluggable local optimizers (Gauss-Newton,
//!   Levenberg-Marquardt, Nelder-Mead)
//! - `fit`: the engine itself (evaluator, candidate pool, refinement stages,
//!   job driver)

pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod solvers;
