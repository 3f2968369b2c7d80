//! Domain types shared across the engine.
//!
//! This module defines:
//!
//! - the immutable sample table consumed by a fit (`SampleMatrix`)
//! - the tunable knobs of one fitting job (`FitConfig`)
//! - the fit output (`FittingResult`)

pub mod types;

pub use types::*;
