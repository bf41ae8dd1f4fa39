//! # Sweep library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the sweep executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Sweep generator module - produces the sawtooth of position commands and runs the control loop
pub mod sweep;
