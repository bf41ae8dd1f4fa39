//! Utility library for the motor sweep software
//!
//! Provides the common plumbing shared by the executables: sessions, logging, parameter loading,
//! archiving and the cyclic module interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
