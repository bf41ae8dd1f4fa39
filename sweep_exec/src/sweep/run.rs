//! The sweep control loop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use can_if::transport::{CanSend, DryRun, Transport};
use log::{debug, error, info, warn};
use serde::Serialize;
use util::{archive::Archived, module::State};

// Internal
use super::{SweepError, SweepGen, TickScheduler, TransportParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Number of commands produced.
    pub num_ticks: u64,

    /// Number of commands the transport failed to send.
    pub num_send_errors: u64,

    /// Number of ticks which overran their deadline.
    pub num_overruns: u64,

    /// Number of times consecutive send failures went past the tolerated limit.
    pub num_escalations: u64,

    /// Number of times the transport recovered after going past the limit.
    pub num_recoveries: u64,

    /// True if the run was ended by cancellation rather than reaching `max_ticks`.
    pub cancelled: bool,
}

/// Counts consecutive send failures and decides when they are worth more than a warning.
#[derive(Debug, Clone)]
pub struct SendFailureTracker {
    /// Number of consecutive failures tolerated before escalating.
    limit: u64,

    num_consec: u64,
}

/// What a dispatch result should be reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReport {
    /// Sent, nothing to report.
    Sent,

    /// Sent after a run of failures which had been escalated, holds the length of the run.
    Recovered(u64),

    /// Failed, holds the number of consecutive failures so far.
    Failed(u64),

    /// Failed, and this failure took the run past the limit. Only reported once per run.
    Escalated(u64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SendFailureTracker {
    pub fn new(limit: u64) -> Self {
        Self { limit, num_consec: 0 }
    }

    /// Record the result of one dispatch.
    pub fn record(&mut self, sent: bool) -> SendReport {
        if sent {
            let run = self.num_consec;
            self.num_consec = 0;

            if run > self.limit {
                SendReport::Recovered(run)
            } else {
                SendReport::Sent
            }
        } else {
            self.num_consec += 1;

            if self.num_consec == self.limit + 1 {
                SendReport::Escalated(self.num_consec)
            } else {
                SendReport::Failed(self.num_consec)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Open the transport described by the parameters.
pub fn open_transport(params: &TransportParams) -> Result<Box<dyn Transport>, SweepError> {
    match params {
        TransportParams::CanSend { interface, program } => {
            Ok(Box::new(CanSend::with_program(interface, program)))
        }
        #[cfg(feature = "socketcan")]
        TransportParams::SocketCan { interface } => {
            can_if::transport::SocketCan::open(interface)
                .map(|t| Box::new(t) as Box<dyn Transport>)
                .map_err(SweepError::TransportInitError)
        }
        #[cfg(not(feature = "socketcan"))]
        TransportParams::SocketCan { .. } => Err(SweepError::TransportUnavailable("socketcan")),
        TransportParams::DryRun => Ok(Box::new(DryRun::default())),
    }
}

/// Run the sweep until `cancel` is set or `max_ticks` commands have been sent.
///
/// Each tick the generator's command is dispatched through `transport`, then the loop suspends
/// until the next tick. Send failures are reported but never retried and never stop the sweep.
/// Cancellation, including during the suspension, ends the run normally.
pub fn run<T>(
    gen: &mut SweepGen,
    transport: &mut T,
    cancel: &AtomicBool,
) -> Result<RunSummary, SweepError>
where
    T: Transport + ?Sized,
{
    let params = gen.params().clone();
    let mut scheduler = TickScheduler::new(params.timing, params.tick_interval()?);
    let mut summary = RunSummary::default();
    let mut failures = SendFailureTracker::new(params.max_consec_send_errors);

    info!(
        "Sweeping 0..{} deg in {} deg steps every {} s through {}",
        params.wrap_bound_deg,
        params.step_size_deg,
        params.tick_interval_s,
        transport.describe()
    );

    loop {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            break;
        }

        scheduler.begin_tick(Instant::now());

        // ---- COMMAND GENERATION ----

        let (output, report) = gen.proc(&())?;

        debug!(
            "Tick {}: {} deg at {} dps -> {}",
            report.tick,
            report.angle_deg,
            output.cmd.speed_limit_dps(),
            output.frame
        );

        // ---- DISPATCH ----

        let result = transport.send(&output.frame);
        let sent = result.is_ok();

        if let Err(ref e) = result {
            summary.num_send_errors += 1;
            warn!("Could not send command for tick {}: {}", report.tick, e);
        }

        match failures.record(sent) {
            SendReport::Sent | SendReport::Failed(_) => (),
            SendReport::Recovered(n) => {
                summary.num_recoveries += 1;
                info!("Transport recovered after {} consecutive failures", n);
            }
            SendReport::Escalated(_) => {
                summary.num_escalations += 1;
                error!(
                    "Maximum number of consecutive send errors ({}) exceeded, the motor may be \
                     unreachable",
                    params.max_consec_send_errors
                );
            }
        }

        // ---- ARCHIVE ----

        gen.report_dispatch(sent);
        if let Err(e) = gen.write() {
            warn!("Could not archive tick {}: {}", report.tick, e);
        }

        summary.num_ticks += 1;

        if let Some(max) = params.max_ticks {
            if summary.num_ticks >= max {
                info!("Reached the maximum number of ticks ({})", max);
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let sleep = scheduler.sleep_duration(Instant::now());
        if scheduler.wait(sleep, cancel) {
            summary.cancelled = true;
            break;
        }
    }

    summary.num_overruns = scheduler.num_overruns();

    Ok(summary)
}
