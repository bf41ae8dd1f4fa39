//! # Bus Transports
//!
//! A [`Transport`] places a single [`CanFrame`] onto a bus. Frames are fire and forget, the actuator
//! never acknowledges a command, so the only failures that can be observed are local ones (the
//! tool or socket could not be used).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::process::{Command, ExitStatus, Stdio};

use log::{info, trace};

use crate::frame::CanFrame;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the `can-utils` program used by [`CanSend`] by default.
pub const CANSEND_PROGRAM: &str = "cansend";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something which can put frames onto a CAN bus.
pub trait Transport {
    /// Send a single frame.
    ///
    /// Returning `Ok` only means the frame left this process, not that the device received it.
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError>;

    /// Short human readable description used in logs.
    fn describe(&self) -> String;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sends frames by running the `cansend` utility once per frame.
#[derive(Debug, Clone)]
pub struct CanSend {
    /// Name of the interface frames are sent on, e.g. `can0`.
    interface: String,

    /// Program to run, `cansend` unless overriden.
    program: String,
}

/// Logs frames without sending them anywhere.
#[derive(Debug, Clone, Default)]
pub struct DryRun {
    num_frames: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while sending a frame.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Could not run `{0}`: {1}")]
    SpawnError(String, std::io::Error),

    #[error("`{program}` exited unsuccessfully ({status})")]
    ToolFailed {
        program: String,
        status: ExitStatus,
    },

    #[error("CAN socket error: {0}")]
    SocketError(std::io::Error),

    #[error("The frame cannot be represented by the transport: {0}")]
    InvalidFrame(CanFrame),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CanSend {
    /// Create a transport sending on `interface` with the system `cansend`.
    pub fn new(interface: &str) -> Self {
        Self::with_program(interface, CANSEND_PROGRAM)
    }

    /// Create a transport which runs `program` instead of `cansend`. The program is called with
    /// the same arguments `cansend` would get.
    pub fn with_program(interface: &str, program: &str) -> Self {
        Self {
            interface: interface.to_string(),
            program: program.to_string(),
        }
    }

    /// The arguments the program is run with for this frame, e.g. `["can0", "141#A400F40128230000"]`.
    pub fn command_args(&self, frame: &CanFrame) -> [String; 2] {
        [self.interface.clone(), frame.to_string()]
    }
}

impl Transport for CanSend {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        let args = self.command_args(frame);

        trace!("Executing: {} {} {}", self.program, args[0], args[1]);

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| TransportError::SpawnError(self.program.clone(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(TransportError::ToolFailed {
                program: self.program.clone(),
                status,
            })
        }
    }

    fn describe(&self) -> String {
        format!("{} on {}", self.program, self.interface)
    }
}

impl DryRun {
    /// Number of frames that would have been sent.
    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }
}

impl Transport for DryRun {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        self.num_frames += 1;
        info!("[dry run] {}", frame);
        Ok(())
    }

    fn describe(&self) -> String {
        String::from("dry run (no bus)")
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ------------------------------------------------------------------------------------------------
// SOCKETCAN
// ------------------------------------------------------------------------------------------------

#[cfg(feature = "socketcan")]
pub use self::socket::SocketCan;

#[cfg(feature = "socketcan")]
mod socket {
    use socketcan::{CanDataFrame, CanSocket, EmbeddedFrame, Socket};

    use super::{Transport, TransportError};
    use crate::frame::CanFrame;

    /// Writes frames straight to a linux SocketCAN interface.
    pub struct SocketCan {
        interface: String,
        socket: CanSocket,
    }

    impl SocketCan {
        /// Open the raw CAN socket for `interface`.
        pub fn open(interface: &str) -> Result<Self, TransportError> {
            let socket = CanSocket::open(interface).map_err(TransportError::SocketError)?;

            Ok(Self {
                interface: interface.to_string(),
                socket,
            })
        }
    }

    impl Transport for SocketCan {
        fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
            let data_frame = CanDataFrame::new(frame.id(), frame.data())
                .ok_or(TransportError::InvalidFrame(*frame))?;

            self.socket
                .write_frame(&data_frame)
                .map_err(TransportError::SocketError)
        }

        fn describe(&self) -> String {
            format!("socketcan on {}", self.interface)
        }
    }
}
