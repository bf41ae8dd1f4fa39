//! Parameters structure for the sweep generator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{path::Path, time::Duration};

use can_if::{frame::device_id_from_raw, Id};
use serde::Deserialize;

use super::SweepError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default bus address of the motor.
pub const DEFAULT_DEVICE_ID: u32 = 0x141;

/// Default interface used by the bus transports.
pub const DEFAULT_INTERFACE: &str = "can0";

/// Longest allowed delay between ticks, one day.
///
/// Units: seconds
pub const MAX_TICK_INTERVAL_S: f64 = 86_400.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the sweep generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- COMMAND ----

    /// Raw arbitration identifier of the motor. Values up to 0x7FF are standard identifiers,
    /// larger values up to 0x1FFFFFFF are extended identifiers.
    pub device_id: u32,

    /// Speed limit sent with every command, must fit in 16 bits.
    ///
    /// Units: degrees/second
    pub speed_limit_dps: u32,

    // ---- SWEEP ----

    /// Amount the target angle advances each tick. Must be positive.
    ///
    /// Units: degrees
    pub step_size_deg: i32,

    /// The target angle is wrapped once it reaches this bound. Must be positive.
    ///
    /// Units: degrees
    pub wrap_bound_deg: i32,

    /// How the angle is brought back below the bound.
    pub wrap_policy: WrapPolicy,

    // ---- TIMING ----

    /// Delay between ticks.
    ///
    /// Units: seconds
    pub tick_interval_s: f64,

    /// How the delay between ticks is applied.
    pub timing: TimingPolicy,

    /// Number of ticks to run for, or `None` to run until cancelled.
    pub max_ticks: Option<u64>,

    // ---- TRANSPORT ----

    /// Number of consecutive transport failures tolerated before an error is reported.
    pub max_consec_send_errors: u64,

    /// Transport used to put frames on the bus.
    pub transport: TransportParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What happens once the angle reaches the wrap bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapPolicy {
    /// Restart from 0. With a step which does not divide the bound evenly the remainder is lost,
    /// e.g. a 7 degree step over 360 degrees goes 350, 357, 0.
    Reset,

    /// Keep the remainder, e.g. a 7 degree step over 360 degrees goes 350, 357, 4.
    Modulo,
}

/// How the tick period is maintained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingPolicy {
    /// Sleep the full interval after each tick. The real period is the dispatch time plus the
    /// interval, so the sweep drifts.
    FixedDelay,

    /// Sleep until the next deadline on the monotonic clock so the period stays fixed.
    Deadline,
}

/// Selects and configures the bus transport.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportParams {
    /// Run the `cansend` tool once per frame.
    #[serde(rename = "cansend")]
    CanSend {
        #[serde(default = "default_interface")]
        interface: String,

        #[serde(default = "default_cansend_program")]
        program: String,
    },

    /// Write to a SocketCAN socket, requires the `socketcan` feature.
    #[serde(rename = "socketcan")]
    SocketCan {
        #[serde(default = "default_interface")]
        interface: String,
    },

    /// Only log the frames.
    DryRun,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID,
            speed_limit_dps: 500,
            step_size_deg: 1,
            wrap_bound_deg: 360,
            wrap_policy: WrapPolicy::Reset,
            tick_interval_s: 0.1,
            timing: TimingPolicy::FixedDelay,
            max_ticks: None,
            max_consec_send_errors: 5,
            transport: TransportParams::default(),
        }
    }
}

impl Params {
    /// Load the parameters from a TOML file, any value missing from the file takes its default.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SweepError> {
        util::params::load_path(path).map_err(SweepError::ParamLoadError)
    }

    /// Check the parameters describe a sweep whose every command can be encoded exactly.
    pub fn validate(&self) -> Result<(), SweepError> {
        self.device_id()?;

        if self.speed_limit_dps > u16::MAX as u32 {
            return Err(SweepError::InvalidParam(
                "speed_limit_dps",
                format!("{} does not fit in 16 bits", self.speed_limit_dps),
            ));
        }

        if self.step_size_deg <= 0 {
            return Err(SweepError::InvalidParam(
                "step_size_deg",
                format!("must be positive, found {}", self.step_size_deg),
            ));
        }

        if self.wrap_bound_deg <= 0 {
            return Err(SweepError::InvalidParam(
                "wrap_bound_deg",
                format!("must be positive, found {}", self.wrap_bound_deg),
            ));
        }

        // Every commanded angle is below the bound, and must fit in centidegrees
        if self.wrap_bound_deg as i64 * 100 > i32::MAX as i64 {
            return Err(SweepError::InvalidParam(
                "wrap_bound_deg",
                format!("{} deg cannot be expressed in 32 bit centidegrees", self.wrap_bound_deg),
            ));
        }

        if !self.tick_interval_s.is_finite()
            || self.tick_interval_s < 0.0
            || self.tick_interval_s > MAX_TICK_INTERVAL_S
        {
            return Err(SweepError::InvalidParam(
                "tick_interval_s",
                format!(
                    "must be between 0 and {} seconds, found {}",
                    MAX_TICK_INTERVAL_S, self.tick_interval_s
                ),
            ));
        }

        Ok(())
    }

    /// The motor's arbitration identifier.
    pub fn device_id(&self) -> Result<Id, SweepError> {
        device_id_from_raw(self.device_id).map_err(SweepError::InvalidDeviceId)
    }

    /// The delay between ticks.
    pub fn tick_interval(&self) -> Result<Duration, SweepError> {
        Duration::try_from_secs_f64(self.tick_interval_s).map_err(|e| {
            SweepError::InvalidParam("tick_interval_s", format!("{}: {}", self.tick_interval_s, e))
        })
    }
}

impl Default for TransportParams {
    fn default() -> Self {
        TransportParams::CanSend {
            interface: default_interface(),
            program: default_cansend_program(),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_interface() -> String {
    String::from(DEFAULT_INTERFACE)
}

fn default_cansend_program() -> String {
    String::from(can_if::transport::CANSEND_PROGRAM)
}
