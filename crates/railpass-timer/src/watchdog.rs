//! The independent inactivity watchdog.
//!
//! The scheduler's timer can fail to fire on time: a suspended host
//! throttles timers, and a bug in reset logic can leave it disarmed. The
//! watchdog does not trust any timer it did not arm itself. Every
//! [`WATCHDOG_CADENCE`] it recomputes `now - last_activity` from the shared
//! [`ActivityClock`] and fires once that reaches the timeout.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::{ActivityClock, ExpiryHook, LogoutLatch, lock, millis};

/// How often the watchdog re-checks the clock.
pub const WATCHDOG_CADENCE: Duration = Duration::from_secs(1);

/// Below this much remaining time, checks are logged at `debug` instead of `trace`.
const NEAR_EXPIRY: Duration = Duration::from_secs(30);

#[derive(Default)]
struct Slot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Periodic backstop for the [`TimeoutScheduler`](crate::TimeoutScheduler).
///
/// At most one interval task is alive per watchdog. The task skips its
/// checks once the shared [`LogoutLatch`] is set, and stops itself after
/// invoking the hook.
pub struct Watchdog {
    timeout: Duration,
    cadence: Duration,
    clock: ActivityClock,
    latch: LogoutLatch,
    runtime: Handle,
    slot: Arc<Mutex<Slot>>,
}

impl Watchdog {
    pub fn new(
        timeout: Duration,
        clock: ActivityClock,
        latch: LogoutLatch,
        runtime: Handle,
    ) -> Self {
        Self {
            timeout,
            cadence: WATCHDOG_CADENCE,
            clock,
            latch,
            runtime,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Overrides the check cadence. Intended for tests and tooling.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Starts the interval, replacing any interval already running.
    pub fn start(&self, on_expire: ExpiryHook) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }

        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);
        let timeout = self.timeout;
        let cadence = self.cadence;
        let clock = self.clock.clone();
        let latch = self.latch.clone();

        let task = self.runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + cadence, cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if latch.is_set() {
                    trace!("logout already triggered, skipping check");
                    continue;
                }

                let elapsed = clock.elapsed();
                let remaining = timeout.saturating_sub(elapsed);
                if remaining < NEAR_EXPIRY {
                    debug!(
                        elapsed_ms = millis(elapsed),
                        remaining_ms = millis(remaining),
                        "watchdog check"
                    );
                } else {
                    trace!(elapsed_ms = millis(elapsed), "watchdog check");
                }

                if elapsed >= timeout {
                    {
                        let mut slot = lock(&shared);
                        if slot.generation != generation {
                            return;
                        }
                        slot.task = None;
                    }
                    info!(
                        elapsed_ms = millis(elapsed),
                        timeout_ms = millis(timeout),
                        "watchdog detected inactivity timeout"
                    );
                    on_expire().await;
                    return;
                }
            }
        });

        slot.task = Some(task);
        debug!(
            cadence_ms = millis(cadence),
            timeout_ms = millis(timeout),
            "watchdog started"
        );
    }

    /// Stops the interval. Returns `true` if one was running.
    pub fn stop(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        match slot.task.take() {
            Some(task) => {
                task.abort();
                debug!("watchdog stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.slot).task.is_some()
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.slot).task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("timeout", &self.timeout)
            .field("cadence", &self.cadence)
            .field("running", &self.is_running())
            .finish()
    }
}
