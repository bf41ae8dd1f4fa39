//! Sweep generator module
//!
//! Drives a single actuator through a repeating sawtooth of target angles: every tick the current
//! angle is encoded into a position command, dispatched on the bus and then advanced by one step,
//! wrapping once it reaches the configured bound.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod run;
mod scheduler;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use can_if::{FrameError, MotorCommandError, TransportError};
use util::{archive::ArchiveError, params::LoadError};

// Internal
pub use params::*;
pub use run::*;
pub use scheduler::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during sweep generation.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Invalid parameter `{0}`: {1}")]
    InvalidParam(&'static str, String),

    #[error("Invalid device id: {0}")]
    InvalidDeviceId(FrameError),

    #[error("Could not load the parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("The sweep generator has not been initialised")]
    NotInitialised,

    #[error("Could not build the motor command: {0}")]
    InvalidCommand(MotorCommandError),

    #[error("Could not create the tick archive: {0}")]
    ArchiveError(ArchiveError),

    #[error("Could not open the transport: {0}")]
    TransportInitError(TransportError),

    #[error("The {0} transport is not available in this build")]
    TransportUnavailable(&'static str),
}
