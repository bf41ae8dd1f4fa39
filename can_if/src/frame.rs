//! # CAN Frames
//!
//! Fixed length (8 byte) CAN 2.0 data frames and the textual form of their arbitration identifiers
//! used by the linux `can-utils` tooling.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use embedded_can::{ExtendedId, Frame as EmbeddedFrame, Id, StandardId};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of data bytes carried by every frame.
pub const PAYLOAD_LEN: usize = 8;

/// Number of hex digits in the textual form of a standard (11 bit) identifier.
const STANDARD_ID_DIGITS: usize = 3;

/// Number of hex digits in the textual form of an extended (29 bit) identifier.
const EXTENDED_ID_DIGITS: usize = 8;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A CAN 2.0 data frame with a full 8 byte payload.
///
/// Frames are plain values, they are built by the motor command encoder and handed straight to a
/// [`Transport`](crate::Transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    data: [u8; PAYLOAD_LEN],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when building frames or identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Expected an identifier of 1 to 3 (standard) or 8 (extended) hex digits, found {0:?}")]
    InvalidIdLength(String),

    #[error("Tried to decode a hex digit but it was out of range ({0:?})")]
    IllegalHexDigit(char),

    #[error("CAN Standard ID ({0:#X}) is out of the valid range (0..=0x7FF)")]
    StandardIdOutOfRange(u32),

    #[error("CAN Extended ID ({0:#X}) is out of the valid range (0..=0x1FFFFFFF)")]
    ExtendedIdOutOfRange(u32),

    #[error("Expected a payload of 8 bytes, found {0} bytes")]
    InvalidPayloadLength(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CanFrame {
    /// Create a new data frame addressed to `id`.
    pub fn new(id: impl Into<Id>, data: [u8; PAYLOAD_LEN]) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Create a new data frame from a slice, which must be exactly 8 bytes long.
    pub fn from_slice(id: impl Into<Id>, data: &[u8]) -> Result<Self, FrameError> {
        let mut copy = [0u8; PAYLOAD_LEN];

        if data.len() != PAYLOAD_LEN {
            return Err(FrameError::InvalidPayloadLength(data.len()));
        }
        copy.copy_from_slice(data);

        Ok(Self::new(id, copy))
    }

    /// Gets the arbitration identifier (destination) of the frame
    pub fn id(&self) -> Id {
        self.id
    }

    /// Gets the payload of the frame
    pub fn data(&self) -> &[u8; PAYLOAD_LEN] {
        &self.data
    }
}

impl EmbeddedFrame for CanFrame {
    /// Only full 8 byte data frames can be represented, any other length returns `None`.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::from_slice(id, data).ok()
    }

    /// Remote frames are never sent to the actuator so cannot be built.
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        PAYLOAD_LEN
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Formats the frame in the `<ID>#<DATA>` form accepted by `cansend`, e.g. `141#A400F40128230000`.
impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#", id_to_hex(self.id))?;
        for byte in self.data.iter() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Format an identifier as upper case hex, 3 digits for standard ids and 8 for extended ids.
pub fn id_to_hex(id: Id) -> String {
    match id {
        Id::Standard(sid) => format!("{:03X}", sid.as_raw()),
        Id::Extended(eid) => format!("{:08X}", eid.as_raw()),
    }
}

/// Build an identifier from its raw value.
///
/// Values which fit in 11 bits become standard identifiers, values which fit in 29 bits become
/// extended identifiers.
pub fn device_id_from_raw(raw: u32) -> Result<Id, FrameError> {
    if raw <= StandardId::MAX.as_raw() as u32 {
        // Fits in 11 bits so the conversion cannot fail
        StandardId::new(raw as u16)
            .map(Id::Standard)
            .ok_or(FrameError::StandardIdOutOfRange(raw))
    } else {
        ExtendedId::new(raw)
            .map(Id::Extended)
            .ok_or(FrameError::ExtendedIdOutOfRange(raw))
    }
}

/// Parse an identifier from the hexadecimal text used by the bus tooling.
///
/// Following `cansend`, up to 3 digits is a standard identifier and exactly 8 digits is an
/// extended identifier, so `"141"` is the standard identifier `0x141`. An optional `0x` prefix is
/// accepted.
pub fn parse_device_id(text: &str) -> Result<Id, FrameError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let num_digits = digits.chars().count();
    if num_digits == 0 || num_digits > EXTENDED_ID_DIGITS {
        return Err(FrameError::InvalidIdLength(text.to_string()));
    }

    let mut value = 0u32;
    for c in digits.chars() {
        let nibble = c.to_digit(16).ok_or(FrameError::IllegalHexDigit(c))?;
        value = (value << 4) | nibble;
    }

    match num_digits {
        1..=STANDARD_ID_DIGITS => StandardId::new(value as u16)
            .map(Id::Standard)
            .ok_or(FrameError::StandardIdOutOfRange(value)),
        EXTENDED_ID_DIGITS => ExtendedId::new(value)
            .map(Id::Extended)
            .ok_or(FrameError::ExtendedIdOutOfRange(value)),
        _ => Err(FrameError::InvalidIdLength(text.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_device_id() {
        assert_eq!(
            parse_device_id("141"),
            Ok(Id::Standard(StandardId::new(0x141).unwrap()))
        );
        assert_eq!(
            parse_device_id("0x7ff"),
            Ok(Id::Standard(StandardId::MAX))
        );
        assert_eq!(
            parse_device_id("1"),
            Ok(Id::Standard(StandardId::new(1).unwrap()))
        );
        assert_eq!(
            parse_device_id("1FFFFFFF"),
            Ok(Id::Extended(ExtendedId::MAX))
        );

        assert_eq!(parse_device_id("FFF"), Err(FrameError::StandardIdOutOfRange(0xFFF)));
        assert_eq!(
            parse_device_id("2FFFFFFF"),
            Err(FrameError::ExtendedIdOutOfRange(0x2FFFFFFF))
        );
        assert_eq!(parse_device_id("14G"), Err(FrameError::IllegalHexDigit('G')));
        assert_eq!(
            parse_device_id("1410"),
            Err(FrameError::InvalidIdLength("1410".into()))
        );
        assert_eq!(parse_device_id(""), Err(FrameError::InvalidIdLength("".into())));
        assert_eq!(
            parse_device_id("123456789"),
            Err(FrameError::InvalidIdLength("123456789".into()))
        );
    }

    #[test]
    fn test_device_id_from_raw() {
        assert_eq!(
            device_id_from_raw(0x141),
            Ok(Id::Standard(StandardId::new(0x141).unwrap()))
        );
        assert_eq!(
            device_id_from_raw(0x800),
            Ok(Id::Extended(ExtendedId::new(0x800).unwrap()))
        );
        assert_eq!(
            device_id_from_raw(0x2000_0000),
            Err(FrameError::ExtendedIdOutOfRange(0x2000_0000))
        );
    }

    #[test]
    fn test_frame_display() {
        let frame = CanFrame::new(
            StandardId::new(0x141).unwrap(),
            [0xA4, 0x00, 0xF4, 0x01, 0x28, 0x23, 0x00, 0x00],
        );
        assert_eq!(frame.to_string(), "141#A400F40128230000");

        let frame = CanFrame::new(ExtendedId::new(0x141).unwrap(), [0; 8]);
        assert_eq!(frame.to_string(), "00000141#0000000000000000");

        let frame = CanFrame::new(StandardId::new(0x1).unwrap(), [0xFF; 8]);
        assert_eq!(frame.to_string(), "001#FFFFFFFFFFFFFFFF");
    }

    #[test]
    fn test_embedded_frame() {
        let id = StandardId::new(0x141).unwrap();

        let frame = <CanFrame as EmbeddedFrame>::new(id, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(EmbeddedFrame::dlc(&frame), 8);
        assert!(!frame.is_extended());
        assert!(frame.is_data_frame());
        assert_eq!(EmbeddedFrame::data(&frame), &[1, 2, 3, 4, 5, 6, 7, 8]);

        assert!(<CanFrame as EmbeddedFrame>::new(id, &[1, 2, 3]).is_none());
        assert!(<CanFrame as EmbeddedFrame>::new_remote(id, 8).is_none());
        assert_eq!(
            CanFrame::from_slice(id, &[0; 9]),
            Err(FrameError::InvalidPayloadLength(9))
        );
    }
}
