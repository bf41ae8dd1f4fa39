//! # CAN interface crate.
//!
//! Provides the frame types, the motor command encoding and the bus transports used to put
//! commands onto a CAN bus.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// CAN frame and arbitration identifier definitions
pub mod frame;

/// Motor position command and its wire encoding
pub mod motor;

/// Transports which place frames onto a bus
pub mod transport;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use embedded_can::{ExtendedId, Id, StandardId};
pub use frame::{CanFrame, FrameError};
pub use motor::{encode, MotorCommand, MotorCommandError};
pub use transport::{Transport, TransportError};
