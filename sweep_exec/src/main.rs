//! # Sweep Executable
//!
//! Repeatedly commands a single CAN bus actuator through a sawtooth of target angles, one position
//! command per tick, until interrupted.
//!
//! Parameters are read from `params/sweep_exec.toml` under the software root, any of which can be
//! overriden on the command line.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use can_if::frame::{id_to_hex, parse_device_id};
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use structopt::StructOpt;

// Internal
use sweep_lib::sweep::{self, Params, SweepGen, TimingPolicy, TransportParams, WrapPolicy};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::{Session, SessionError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PARAMS_FILE: &str = "sweep_exec.toml";

// ------------------------------------------------------------------------------------------------
// COMMAND LINE
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "sweep_exec", about = "Sweeps a CAN bus motor through a range of angles")]
struct Opt {
    /// Parameter file to use instead of `params/sweep_exec.toml`
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Motor bus address in hex, e.g. 141
    #[structopt(long, parse(try_from_str = parse_raw_device_id))]
    device_id: Option<u32>,

    /// Speed limit in degrees/second
    #[structopt(long)]
    speed: Option<u32>,

    /// Angle increment per tick in degrees
    #[structopt(long)]
    step: Option<i32>,

    /// Seconds between ticks
    #[structopt(long)]
    interval: Option<f64>,

    /// Angle in degrees at which the sweep wraps
    #[structopt(long)]
    wrap: Option<i32>,

    /// Stop after this many ticks
    #[structopt(long)]
    ticks: Option<u64>,

    /// CAN interface to send on
    #[structopt(long)]
    interface: Option<String>,

    /// Log frames instead of sending them
    #[structopt(long)]
    dry_run: bool,

    /// Keep a fixed tick period rather than sleeping a fixed delay
    #[structopt(long)]
    deadline: bool,

    /// Carry the remainder over when wrapping rather than restarting from 0
    #[structopt(long)]
    modulo: bool,

    /// Show every frame on the console
    #[structopt(short, long)]
    verbose: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Sessions go under the software root if it is set, otherwise the working directory
    let session = match Session::new("sweep_exec", "sessions") {
        Err(SessionError::SwRootNotSet) => {
            Session::new_in(PathBuf::from("."), "sweep_exec", "sessions")
        }
        r => r,
    }
    .wrap_err("Failed to create the session")?;

    let console_level = if opt.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logger_init(LevelFilter::Trace, console_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Sweep Executable\n");
    match host::get_hostname() {
        Some(h) => info!("Running on: {}", h),
        None => warn!("Could not determine the host name"),
    }
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let mut params: Params = match opt.params {
        Some(ref path) => Params::from_file(path)
            .wrap_err_with(|| format!("Failed to load parameters from {:?}", path))?,
        None => match util::params::load(PARAMS_FILE) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not load {} ({}), using the default parameters", PARAMS_FILE, e);
                Params::default()
            }
        },
    };

    apply_overrides(&mut params, &opt);

    info!("Parameters loaded");
    info!(
        "Motor {} at {} dps, {} deg steps wrapping at {} deg ({:?}), every {} s ({:?})",
        id_to_hex(params.device_id().wrap_err("Invalid device id")?),
        params.speed_limit_dps,
        params.step_size_deg,
        params.wrap_bound_deg,
        params.wrap_policy,
        params.tick_interval_s,
        params.timing
    );

    // ---- MODULE INITIALISATION ----

    let transport_params = params.transport.clone();

    let mut sweep_gen = SweepGen::default();
    sweep_gen
        .init(params, &session)
        .wrap_err("Failed to initialise the sweep generator")?;

    info!("Sweep generator initialised");

    let mut transport = sweep::open_transport(&transport_params)
        .wrap_err("Failed to open the transport")?;

    info!("Transport initialised: {}", transport.describe());

    // ---- SIGNAL HANDLING ----

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .wrap_err("Failed to set the interrupt handler")?;
    }

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop");

    let summary = sweep::run(&mut sweep_gen, transport.as_mut(), &cancel)
        .wrap_err("Error in the main loop")?;

    if summary.cancelled {
        info!("Interrupted");
    }
    info!(
        "{} commands generated, {} failed to send, {} ticks overran",
        summary.num_ticks, summary.num_send_errors, summary.num_overruns
    );

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse the hex device id given on the command line into the raw value used in the parameters.
fn parse_raw_device_id(s: &str) -> Result<u32, can_if::FrameError> {
    parse_device_id(s).map(|id| match id {
        can_if::Id::Standard(id) => id.as_raw() as u32,
        can_if::Id::Extended(id) => id.as_raw(),
    })
}

/// Apply the command line overrides on top of the loaded parameters.
fn apply_overrides(params: &mut Params, opt: &Opt) {
    if let Some(id) = opt.device_id {
        params.device_id = id;
    }
    if let Some(speed) = opt.speed {
        params.speed_limit_dps = speed;
    }
    if let Some(step) = opt.step {
        params.step_size_deg = step;
    }
    if let Some(interval) = opt.interval {
        params.tick_interval_s = interval;
    }
    if let Some(wrap) = opt.wrap {
        params.wrap_bound_deg = wrap;
    }
    if let Some(ticks) = opt.ticks {
        params.max_ticks = Some(ticks);
    }
    if opt.deadline {
        params.timing = TimingPolicy::Deadline;
    }
    if opt.modulo {
        params.wrap_policy = WrapPolicy::Modulo;
    }

    if opt.dry_run {
        params.transport = TransportParams::DryRun;
    } else if let Some(ref interface) = opt.interface {
        match params.transport {
            TransportParams::CanSend { interface: ref mut i, .. }
            | TransportParams::SocketCan { interface: ref mut i } => *i = interface.clone(),
            TransportParams::DryRun => {
                params.transport = TransportParams::CanSend {
                    interface: interface.clone(),
                    program: String::from(can_if::transport::CANSEND_PROGRAM),
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_overrides() {
        let opt = Opt::from_iter(&[
            "sweep_exec", "--device-id", "142", "--step", "7", "--modulo", "--interface", "vcan0",
        ]);

        let mut params = Params::default();
        apply_overrides(&mut params, &opt);

        assert_eq!(params.device_id, 0x142);
        assert_eq!(params.step_size_deg, 7);
        assert_eq!(params.wrap_policy, WrapPolicy::Modulo);
        assert_eq!(params.timing, TimingPolicy::FixedDelay);
        assert_eq!(
            params.transport,
            TransportParams::CanSend {
                interface: String::from("vcan0"),
                program: String::from("cansend"),
            }
        );

        // Untouched values stay as loaded
        assert_eq!(params.speed_limit_dps, 500);
        assert_eq!(params.max_ticks, None);
    }

    #[test]
    fn test_dry_run_override() {
        let opt = Opt::from_iter(&["sweep_exec", "--dry-run", "--interface", "vcan0", "--ticks", "3"]);

        let mut params = Params::default();
        apply_overrides(&mut params, &opt);

        assert_eq!(params.transport, TransportParams::DryRun);
        assert_eq!(params.max_ticks, Some(3));
    }

    #[test]
    fn test_parse_raw_device_id() {
        assert_eq!(parse_raw_device_id("141").unwrap(), 0x141);
        assert_eq!(parse_raw_device_id("0x7FF").unwrap(), 0x7FF);
        assert_eq!(parse_raw_device_id("1FFFFFFF").unwrap(), 0x1FFF_FFFF);
        assert!(parse_raw_device_id("800").is_err());
        assert!(parse_raw_device_id("").is_err());
        assert!(parse_raw_device_id("14G").is_err());
    }
}
