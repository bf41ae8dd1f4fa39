//! Tick scheduling

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use log::warn;

use super::TimingPolicy;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest single sleep, so cancellation is noticed promptly during long intervals.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Decides how long to suspend between ticks.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    policy: TimingPolicy,

    interval: Duration,

    /// When the next tick should start, only used by `TimingPolicy::Deadline`.
    next_deadline: Option<Instant>,

    /// Number of ticks which finished after their deadline.
    num_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TickScheduler {
    pub fn new(policy: TimingPolicy, interval: Duration) -> Self {
        Self {
            policy,
            interval,
            next_deadline: None,
            num_overruns: 0,
        }
    }

    /// Mark the start of a tick. The first call anchors the deadlines.
    pub fn begin_tick(&mut self, now: Instant) {
        if self.next_deadline.is_none() {
            self.next_deadline = Some(now + self.interval);
        }
    }

    /// How long to sleep after a tick which finished at `now`.
    pub fn sleep_duration(&mut self, now: Instant) -> Duration {
        match self.policy {
            TimingPolicy::FixedDelay => self.interval,
            TimingPolicy::Deadline => {
                let deadline = *self.next_deadline.get_or_insert(now);

                match deadline.checked_duration_since(now) {
                    Some(remaining) => {
                        self.next_deadline = Some(deadline + self.interval);
                        remaining
                    }
                    None => {
                        warn!(
                            "Tick overran by {:.06} s",
                            now.duration_since(deadline).as_secs_f64()
                        );
                        self.num_overruns += 1;

                        // Re-base rather than bursting ticks to catch up
                        self.next_deadline = Some(now + self.interval);
                        Duration::from_secs(0)
                    }
                }
            }
        }
    }

    /// Sleep for `duration`, returning early with `true` if `cancel` gets set.
    pub fn wait(&self, duration: Duration, cancel: &AtomicBool) -> bool {
        let end = Instant::now() + duration;

        loop {
            if cancel.load(Ordering::Relaxed) {
                return true;
            }

            let now = Instant::now();
            if now >= end {
                return false;
            }

            thread::sleep((end - now).min(MAX_SLEEP_SLICE));
        }
    }

    /// Number of ticks which finished after their deadline.
    pub fn num_overruns(&self) -> u64 {
        self.num_overruns
    }
}
