//! Implementations for the sweep generator state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use can_if::{CanFrame, Id, MotorCommand};
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{Params, SweepError, WrapPolicy};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Path of the tick archive relative to the session's archive root.
const TICK_ARCHIVE_PATH: &str = "sweep/ticks.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The only mutable state of the sweep, the angle commanded on the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepState {
    /// Always in `[0, wrap_bound_deg)`.
    ///
    /// Units: degrees
    pub current_angle_deg: i32,
}

/// Sweep generator module state
#[derive(Default)]
pub struct SweepGen {
    pub(crate) params: Params,

    /// Validated identifier of the motor, `None` until configured.
    device_id: Option<Id>,

    pub(crate) state: SweepState,

    /// Number of ticks processed so far.
    num_ticks: u64,

    /// Record of the last tick, written out by `Archived::write`.
    last_record: Option<TickRecord>,
    arch_ticks: Archiver,
}

/// Output of one tick of the generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputData {
    /// The command for this tick.
    pub cmd: MotorCommand,

    /// The encoded command, ready for the transport.
    pub frame: CanFrame,
}

/// Status report for one tick of the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Index of the tick, starting from 0.
    pub tick: u64,

    /// Angle commanded on this tick.
    ///
    /// Units: degrees
    pub angle_deg: i32,

    /// Angle that will be commanded on the next tick.
    ///
    /// Units: degrees
    pub next_angle_deg: i32,

    /// True if the angle wrapped back below the bound after this tick.
    pub wrapped: bool,
}

/// A row of the tick archive.
#[derive(Debug, Clone, Serialize)]
struct TickRecord {
    time_s: f64,
    tick: u64,
    angle_deg: i32,
    speed_limit_dps: u16,
    frame: String,
    sent: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SweepState {
    /// The state after one more tick.
    ///
    /// `params` must have passed [`Params::validate`], so the step and bound are positive.
    pub fn next(&self, params: &Params) -> SweepState {
        self.advance(params).0
    }

    /// The state after one more tick, and whether the angle reached the bound and was wrapped.
    pub fn advance(&self, params: &Params) -> (SweepState, bool) {
        // i64 so a large step cannot overflow before wrapping
        let advanced = self.current_angle_deg as i64 + params.step_size_deg as i64;
        let bound = params.wrap_bound_deg as i64;
        let wrapped = advanced >= bound;

        let current_angle_deg = match params.wrap_policy {
            WrapPolicy::Reset if wrapped => 0,
            WrapPolicy::Reset => advanced,
            WrapPolicy::Modulo => advanced % bound,
        };

        (
            SweepState {
                current_angle_deg: current_angle_deg as i32,
            },
            wrapped,
        )
    }
}

impl SweepGen {
    /// Create a generator from the given parameters, without archiving.
    pub fn new(params: Params) -> Result<Self, SweepError> {
        let mut gen = Self::default();
        gen.configure(params)?;
        Ok(gen)
    }

    /// The parameters the generator is running with.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The current state of the sweep.
    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Number of ticks processed so far.
    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    /// Record whether the frame produced by the last tick was handed to the bus.
    pub fn report_dispatch(&mut self, sent: bool) {
        if let Some(ref mut r) = self.last_record {
            r.sent = sent;
        }
    }

    /// Validate and apply new parameters, restarting the sweep from 0.
    fn configure(&mut self, params: Params) -> Result<(), SweepError> {
        params.validate()?;

        self.device_id = Some(params.device_id()?);
        self.params = params;
        self.state = SweepState::default();
        self.num_ticks = 0;
        self.last_record = None;

        Ok(())
    }
}

impl State for SweepGen {
    type InitData = Params;
    type InitError = SweepError;

    type InputData = ();
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = SweepError;

    /// Initialise the generator.
    ///
    /// Expected init data is the (already loaded and overriden) parameters.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.configure(init_data)?;

        self.arch_ticks = Archiver::from_path(session, TICK_ARCHIVE_PATH)
            .map_err(SweepError::ArchiveError)?;

        Ok(())
    }

    /// Produce the command for this tick and advance the sweep.
    ///
    /// The advance happens before the frame is dispatched, which is equivalent to advancing after
    /// since the result of a dispatch never feeds back into the sweep.
    fn proc(&mut self, _input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let device_id = self.device_id.ok_or(SweepError::NotInitialised)?;

        let cmd = MotorCommand::try_new(
            self.state.current_angle_deg as f64,
            self.params.speed_limit_dps,
            device_id,
        )
        .map_err(SweepError::InvalidCommand)?;
        let frame = cmd.to_frame();

        let (next, wrapped) = self.state.advance(&self.params);

        let report = StatusReport {
            tick: self.num_ticks,
            angle_deg: self.state.current_angle_deg,
            next_angle_deg: next.current_angle_deg,
            wrapped,
        };

        trace!("Tick {}: {:?} -> {:?}", report.tick, self.state, next);
        if report.wrapped {
            debug!(
                "Sweep wrapped from {} deg to {} deg",
                report.angle_deg, report.next_angle_deg
            );
        }

        self.last_record = Some(TickRecord {
            time_s: session::get_elapsed_seconds(),
            tick: report.tick,
            angle_deg: report.angle_deg,
            speed_limit_dps: cmd.speed_limit_dps(),
            frame: frame.to_string(),
            sent: false,
        });

        self.state = next;
        self.num_ticks += 1;

        Ok((OutputData { cmd, frame }, report))
    }
}

impl Archived for SweepGen {
    /// Write the last tick to the archive. Does nothing if the generator was not initialised with
    /// a session.
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch_ticks.is_initialised() {
            return Ok(());
        }

        match self.last_record.take() {
            Some(r) => self.arch_ticks.serialise(r),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use can_if::StandardId;

    fn params(step_size_deg: i32, wrap_bound_deg: i32, wrap_policy: WrapPolicy) -> Params {
        Params {
            step_size_deg,
            wrap_bound_deg,
            wrap_policy,
            ..Default::default()
        }
    }

    /// Angles commanded over `n` ticks.
    fn angles(gen: &mut SweepGen, n: usize) -> Vec<i32> {
        (0..n).map(|_| gen.proc(&()).unwrap().1.angle_deg).collect()
    }

    #[test]
    fn test_next_reset() {
        let p = params(1, 360, WrapPolicy::Reset);

        assert_eq!(SweepState::default().next(&p), SweepState { current_angle_deg: 1 });
        assert_eq!(
            SweepState { current_angle_deg: 358 }.next(&p),
            SweepState { current_angle_deg: 359 }
        );
        assert_eq!(
            SweepState { current_angle_deg: 359 }.next(&p),
            SweepState { current_angle_deg: 0 }
        );

        // 51 * 7 = 357 is the last angle below the bound, then straight back to 0
        let p = params(7, 360, WrapPolicy::Reset);
        assert_eq!(
            SweepState { current_angle_deg: 357 }.next(&p),
            SweepState { current_angle_deg: 0 }
        );

        // A step at least as large as the bound pins the sweep at 0
        let p = params(400, 360, WrapPolicy::Reset);
        assert_eq!(SweepState::default().next(&p), SweepState::default());

        let p = params(i32::MAX, 360, WrapPolicy::Reset);
        assert_eq!(
            SweepState { current_angle_deg: 359 }.next(&p),
            SweepState::default()
        );
    }

    #[test]
    fn test_next_modulo() {
        let p = params(7, 360, WrapPolicy::Modulo);
        assert_eq!(
            SweepState { current_angle_deg: 357 }.next(&p),
            SweepState { current_angle_deg: 4 }
        );

        let p = params(1, 360, WrapPolicy::Modulo);
        assert_eq!(
            SweepState { current_angle_deg: 359 }.next(&p),
            SweepState { current_angle_deg: 0 }
        );
    }

    #[test]
    fn test_wrap_flag() {
        let p = params(1, 360, WrapPolicy::Reset);
        assert!(!SweepState { current_angle_deg: 358 }.advance(&p).1);
        assert!(SweepState { current_angle_deg: 359 }.advance(&p).1);

        // A step equal to the bound wraps 0 back onto 0 every tick
        let p = params(360, 360, WrapPolicy::Modulo);
        assert_eq!(SweepState::default().advance(&p), (SweepState::default(), true));

        let mut gen = SweepGen::new(p).unwrap();
        for _ in 0..3 {
            let (_, report) = gen.proc(&()).unwrap();
            assert_eq!(report.angle_deg, 0);
            assert_eq!(report.next_angle_deg, 0);
            assert!(report.wrapped);
        }
    }

    #[test]
    fn test_tick_360_commands_zero() {
        let mut gen = SweepGen::new(Params::default()).unwrap();
        let seq = angles(&mut gen, 362);

        // Ticks are counted from 1 here: the 360th tick commands 359, then the angle resets
        assert_eq!(seq[0], 0);
        assert_eq!(seq[359], 359);
        assert_eq!(seq[360], 0);
        assert_eq!(seq[361], 1);
        assert!(seq.iter().all(|&a| (0..360).contains(&a)));
        assert_eq!(gen.num_ticks(), 362);
    }

    #[test]
    fn test_sawtooth_period() {
        // ceil(360 / 7) = 52 ticks per period
        let mut gen = SweepGen::new(params(7, 360, WrapPolicy::Reset)).unwrap();
        let seq = angles(&mut gen, 52 * 3);

        let period: Vec<i32> = (0..52).map(|i| i * 7).collect();
        assert_eq!(&seq[0..52], &period[..]);
        assert_eq!(&seq[52..104], &period[..]);
        assert_eq!(&seq[104..156], &period[..]);

        // Non-decreasing except at the wrap, which always lands on 0
        for w in seq.windows(2) {
            assert!(w[1] > w[0] || w[1] == 0);
        }
    }

    #[test]
    fn test_proc_output() {
        let mut gen = SweepGen::new(Params {
            speed_limit_dps: 500,
            step_size_deg: 90,
            ..Default::default()
        })
        .unwrap();

        let (out, report) = gen.proc(&()).unwrap();
        assert_eq!(report, StatusReport { tick: 0, angle_deg: 0, next_angle_deg: 90, wrapped: false });
        assert_eq!(out.cmd.target_angle_centideg(), 0);

        let (out, report) = gen.proc(&()).unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(out.frame.to_string(), "141#A400F40128230000");
        assert_eq!(out.frame.id(), Id::Standard(StandardId::new(0x141).unwrap()));
        assert_eq!(out.frame, out.cmd.to_frame());

        gen.proc(&()).unwrap();
        let (_, report) = gen.proc(&()).unwrap();
        assert_eq!(report.angle_deg, 270);
        assert!(report.wrapped);
        assert_eq!(gen.state(), SweepState::default());
    }

    #[test]
    fn test_uninitialised_proc() {
        let mut gen = SweepGen::default();
        match gen.proc(&()) {
            Err(SweepError::NotInitialised) => (),
            r => panic!("Expected not initialised, got {:?}", r.map(|(_, r)| r)),
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(SweepGen::new(params(0, 360, WrapPolicy::Reset)).is_err());
    }

    #[test]
    fn test_write_without_session() {
        let mut gen = SweepGen::new(Params::default()).unwrap();
        gen.proc(&()).unwrap();
        gen.report_dispatch(true);
        assert!(gen.write().is_ok());
    }
}
