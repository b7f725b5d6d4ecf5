//! The debounced session timer.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::{ExpiryHook, lock, millis};

/// Lifecycle of the scheduler's single timer.
///
/// ```text
///   Idle ──(arm)──→ Armed ──(timeout elapses)──→ Firing ──(hook done)──→ Idle
///                     │  ↑
///                     └──┘ (arm again: previous timer cancelled)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// No timer outstanding.
    #[default]
    Idle,
    /// A timer is counting down.
    Armed,
    /// The timer elapsed and the expiry hook is running.
    Firing,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Armed => write!(f, "Armed"),
            Self::Firing => write!(f, "Firing"),
        }
    }
}

#[derive(Default)]
struct Slot {
    /// Bumped by every arm/cancel. A timer task only fires if the
    /// generation it was spawned under is still current.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    state: SchedulerState,
}

/// A single debounced timer: at any instant there is zero or one live timer.
///
/// [`arm`](Self::arm) replaces whatever timer is outstanding, which makes
/// "reset on every user interaction" a single call. The timer task is
/// spawned on the runtime handle given at construction, so `arm` and
/// `cancel` are plain synchronous calls usable from event callbacks.
pub struct TimeoutScheduler {
    timeout: Duration,
    runtime: Handle,
    slot: Arc<Mutex<Slot>>,
}

impl TimeoutScheduler {
    pub fn new(timeout: Duration, runtime: Handle) -> Self {
        Self {
            timeout,
            runtime,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Cancels any outstanding timer and arms a fresh one for the full timeout.
    pub fn arm(&self, on_expire: ExpiryHook) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        if let Some(previous) = slot.timer.take() {
            previous.abort();
        }

        let generation = slot.generation;
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;
        let shared = Arc::clone(&self.slot);

        let timer = self.runtime.spawn(async move {
            time::sleep_until(deadline).await;
            {
                let mut slot = lock(&shared);
                if slot.generation != generation {
                    return;
                }
                // Detach our own handle: the hook is expected to cancel
                // the scheduler, and that must not abort this task.
                slot.timer = None;
                slot.state = SchedulerState::Firing;
            }

            debug!(
                timeout_ms = millis(timeout),
                "session timer expired"
            );
            on_expire().await;

            let mut slot = lock(&shared);
            if slot.generation == generation {
                slot.state = SchedulerState::Idle;
            }
        });

        slot.timer = Some(timer);
        slot.state = SchedulerState::Armed;
        debug!(timeout_ms = millis(timeout), "session timer armed");
    }

    /// Cancels the outstanding timer, if any. Returns `true` if one was live.
    ///
    /// Safe to call repeatedly and from inside the expiry hook.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.state = SchedulerState::Idle;
        match slot.timer.take() {
            Some(timer) => {
                timer.abort();
                debug!("session timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        lock(&self.slot).state
    }
}

impl Drop for TimeoutScheduler {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.slot).timer.take() {
            timer.abort();
        }
    }
}

impl fmt::Debug for TimeoutScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutScheduler")
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish()
    }
}
