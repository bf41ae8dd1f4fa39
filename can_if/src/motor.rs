//! # Motor Position Commands
//!
//! Encoding of the "position control with speed limit" command understood by the rotary actuator.
//!
//! The command is a single 8 byte frame addressed to the motor's arbitration identifier:
//!
//! | Byte  | Content                                                   |
//! |-------|-----------------------------------------------------------|
//! | 0     | Opcode `0xA4`                                             |
//! | 1     | Reserved, always `0x00`                                   |
//! | 2..4  | Speed limit in degrees/second, `u16` little endian        |
//! | 4..8  | Target angle in centidegrees, `i32` little endian         |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use embedded_can::Id;

use crate::frame::{CanFrame, PAYLOAD_LEN};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Opcode for "position control with speed limit".
pub const POSITION_CTRL_SPEED_LIMIT_OPCODE: u8 = 0xA4;

/// Value of the reserved byte following the opcode.
pub const RESERVED: u8 = 0x00;

/// Number of centidegrees in a degree.
pub const CENTIDEG_PER_DEG: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position demand for a single actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    /// Target angle.
    ///
    /// Units: centidegrees (1/100 degree)
    target_angle_centideg: i32,

    /// Maximum speed the actuator may use to reach the target.
    ///
    /// Units: degrees/second
    speed_limit_dps: u16,

    /// Bus address of the actuator.
    device_id: Id,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors associated with building or decoding a [`MotorCommand`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotorCommandError {
    #[error("Invalid command: target angle ({0} deg) is not a finite number")]
    NonFiniteAngle(f64),

    #[error("Invalid command: target angle ({0} deg) does not fit in a 32 bit centidegree field")]
    AngleOutOfRange(f64),

    #[error("Invalid command: speed limit ({0} dps) does not fit in a 16 bit field")]
    SpeedOutOfRange(u32),

    #[error("Frame does not hold a position command, found opcode {0:#04X}")]
    UnexpectedOpcode(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorCommand {
    /// Build a command, silently truncating out of range inputs.
    ///
    /// The angle is multiplied by 100, truncated toward zero and wrapped to 32 bits (two's
    /// complement). The speed keeps only its low 16 bits, so 65536 dps becomes 0 dps. A NaN angle
    /// becomes 0. Use [`MotorCommand::try_new`] to reject such inputs instead.
    pub fn new(angle_deg: f64, speed_limit_dps: u32, device_id: impl Into<Id>) -> Self {
        let centideg = (angle_deg * CENTIDEG_PER_DEG).trunc();

        Self {
            // Going through i64 keeps the low 32 bits rather than saturating at i32::MAX
            target_angle_centideg: centideg as i64 as i32,
            speed_limit_dps: (speed_limit_dps & 0xFFFF) as u16,
            device_id: device_id.into(),
        }
    }

    /// Build a command, rejecting inputs which do not fit in their wire fields.
    pub fn try_new(
        angle_deg: f64,
        speed_limit_dps: u32,
        device_id: impl Into<Id>,
    ) -> Result<Self, MotorCommandError> {
        if !angle_deg.is_finite() {
            return Err(MotorCommandError::NonFiniteAngle(angle_deg));
        }

        let centideg = (angle_deg * CENTIDEG_PER_DEG).trunc();
        if centideg < i32::MIN as f64 || centideg > i32::MAX as f64 {
            return Err(MotorCommandError::AngleOutOfRange(angle_deg));
        }

        if speed_limit_dps > u16::MAX as u32 {
            return Err(MotorCommandError::SpeedOutOfRange(speed_limit_dps));
        }

        Ok(Self {
            target_angle_centideg: centideg as i32,
            speed_limit_dps: speed_limit_dps as u16,
            device_id: device_id.into(),
        })
    }

    /// Decode a command from a frame, the identifier of the frame becomes the device id.
    pub fn from_frame(frame: &CanFrame) -> Result<Self, MotorCommandError> {
        let data = frame.data();

        if data[0] != POSITION_CTRL_SPEED_LIMIT_OPCODE {
            return Err(MotorCommandError::UnexpectedOpcode(data[0]));
        }

        Ok(Self {
            target_angle_centideg: LittleEndian::read_i32(&data[4..8]),
            speed_limit_dps: LittleEndian::read_u16(&data[2..4]),
            device_id: frame.id(),
        })
    }

    /// Encode the command into the frame sent to the actuator.
    pub fn to_frame(&self) -> CanFrame {
        let mut data = [0u8; PAYLOAD_LEN];

        data[0] = POSITION_CTRL_SPEED_LIMIT_OPCODE;
        data[1] = RESERVED;
        LittleEndian::write_u16(&mut data[2..4], self.speed_limit_dps);
        LittleEndian::write_i32(&mut data[4..8], self.target_angle_centideg);

        CanFrame::new(self.device_id, data)
    }

    /// Target angle in centidegrees
    pub fn target_angle_centideg(&self) -> i32 {
        self.target_angle_centideg
    }

    /// Target angle in degrees
    pub fn target_angle_deg(&self) -> f64 {
        self.target_angle_centideg as f64 / CENTIDEG_PER_DEG
    }

    /// Speed limit in degrees/second
    pub fn speed_limit_dps(&self) -> u16 {
        self.speed_limit_dps
    }

    /// Bus address of the actuator
    pub fn device_id(&self) -> Id {
        self.device_id
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a position command for the actuator at `device_id`.
///
/// Total over its inputs: see [`MotorCommand::new`] for how out of range values are truncated.
pub fn encode(angle_deg: f64, speed_limit_dps: u32, device_id: impl Into<Id>) -> CanFrame {
    MotorCommand::new(angle_deg, speed_limit_dps, device_id).to_frame()
}

#[cfg(test)]
mod test {
    use super::*;
    use embedded_can::{ExtendedId, StandardId};

    fn motor_id() -> StandardId {
        StandardId::new(0x141).unwrap()
    }

    #[test]
    fn test_encode_90_deg() {
        let frame = encode(90.0, 500, motor_id());

        assert_eq!(frame.id(), Id::Standard(motor_id()));
        assert_eq!(
            frame.data(),
            &[0xA4, 0x00, 0xF4, 0x01, 0x28, 0x23, 0x00, 0x00]
        );
        assert_eq!(frame.to_string(), "141#A400F40128230000");
    }

    #[test]
    fn test_encode_layout() {
        // Fractional angle and a speed using both bytes
        let frame = encode(359.75, 0x1234, motor_id());
        assert_eq!(
            frame.data(),
            &[0xA4, 0x00, 0x34, 0x12, 0x87, 0x8C, 0x00, 0x00]
        );

        // Negative angles are two's complement
        let frame = encode(-1.0, 0, motor_id());
        assert_eq!(
            frame.data(),
            &[0xA4, 0x00, 0x00, 0x00, 0x9C, 0xFF, 0xFF, 0xFF]
        );

        // Zero
        let frame = encode(0.0, 500, motor_id());
        assert_eq!(
            frame.data(),
            &[0xA4, 0x00, 0xF4, 0x01, 0x00, 0x00, 0x00, 0x00]
        );

        // Extended ids are passed through untouched
        let eid = ExtendedId::new(0x1234_5678).unwrap();
        assert_eq!(encode(1.0, 1, eid).id(), Id::Extended(eid));
    }

    #[test]
    fn test_truncation_toward_zero() {
        assert_eq!(MotorCommand::new(1.239, 0, motor_id()).target_angle_centideg(), 123);
        assert_eq!(MotorCommand::new(-1.239, 0, motor_id()).target_angle_centideg(), -123);
        assert_eq!(MotorCommand::new(0.009, 0, motor_id()).target_angle_centideg(), 0);
    }

    #[test]
    fn test_silent_masking() {
        // Speed keeps its low 16 bits only
        let cmd = MotorCommand::new(0.0, 0x1_01F4, motor_id());
        assert_eq!(cmd.speed_limit_dps(), 500);

        // Angle wraps at 32 bits: 3e9 centidegrees becomes 3e9 - 2^32
        let cmd = MotorCommand::new(30_000_000.0, 0, motor_id());
        assert_eq!(cmd.target_angle_centideg(), -1_294_967_296);

        // NaN has no integer value
        let cmd = MotorCommand::new(f64::NAN, 0, motor_id());
        assert_eq!(cmd.target_angle_centideg(), 0);
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert_eq!(
            MotorCommand::try_new(0.0, 65_536, motor_id()),
            Err(MotorCommandError::SpeedOutOfRange(65_536))
        );
        assert_eq!(
            MotorCommand::try_new(30_000_000.0, 0, motor_id()),
            Err(MotorCommandError::AngleOutOfRange(30_000_000.0))
        );
        assert_eq!(
            MotorCommand::try_new(-30_000_000.0, 0, motor_id()),
            Err(MotorCommandError::AngleOutOfRange(-30_000_000.0))
        );
        assert_eq!(
            MotorCommand::try_new(f64::INFINITY, 0, motor_id()),
            Err(MotorCommandError::NonFiniteAngle(f64::INFINITY))
        );

        // Limits of the fields are fine
        let cmd = MotorCommand::try_new(21_474_836.0, 65_535, motor_id()).unwrap();
        assert_eq!(cmd.target_angle_centideg(), 2_147_483_600);
        assert_eq!(cmd.speed_limit_dps(), u16::MAX);

        // In range inputs agree with the truncating constructor
        assert_eq!(
            MotorCommand::try_new(-45.5, 500, motor_id()),
            Ok(MotorCommand::new(-45.5, 500, motor_id()))
        );
    }

    #[test]
    fn test_decode_recovers_command() {
        for &(angle, speed) in [(90.0, 500), (-720.25, 1), (0.0, 65_535), (123.5, 0)].iter() {
            let frame = encode(angle, speed, motor_id());
            let cmd = MotorCommand::from_frame(&frame).unwrap();

            assert_eq!(cmd.speed_limit_dps() as u32, speed);
            assert!((cmd.target_angle_deg() - angle).abs() < 0.01);
            assert_eq!(cmd.device_id(), Id::Standard(motor_id()));
            assert_eq!(cmd.to_frame(), frame);
        }

        let frame = CanFrame::new(motor_id(), [0x88, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            MotorCommand::from_frame(&frame),
            Err(MotorCommandError::UnexpectedOpcode(0x88))
        );
    }
}
