//! Inactivity detection for Railpass sessions.
//!
//! Two independent detectors watch the same [`ActivityClock`]:
//!
//! - [`TimeoutScheduler`]: one debounced timer. Every reset cancels the
//!   previous timer and arms a fresh one; if nothing resets it for the
//!   full timeout, it fires.
//! - [`Watchdog`]: a fixed-cadence ([`WATCHDOG_CADENCE`]) liveness check
//!   that recomputes "time since last activity" from the clock. It exists
//!   because timers can be coalesced or throttled while the host is
//!   suspended; polling the clock catches an expiry the timer missed. The
//!   cost is one wake-up per cadence while a session is authenticated.
//!
//! Neither detector knows what "logging out" means. Both invoke an
//! [`ExpiryHook`] supplied by the session layer, and both consult the same
//! [`LogoutLatch`] so the hook's work happens at most once.
//!
//! ```ignore
//! let clock = ActivityClock::new();
//! let latch = LogoutLatch::new();
//! let scheduler = TimeoutScheduler::new(timeout, Handle::current());
//! let watchdog = Watchdog::new(timeout, clock.clone(), latch.clone(), Handle::current());
//!
//! scheduler.arm(hook(|| async { /* force logout */ }));
//! watchdog.start(hook(|| async { /* force logout */ }));
//! ```

mod clock;
mod latch;
mod scheduler;
mod watchdog;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

pub use clock::ActivityClock;
pub use latch::LogoutLatch;
pub use scheduler::{SchedulerState, TimeoutScheduler};
pub use watchdog::{WATCHDOG_CADENCE, Watchdog};

/// Callback a detector runs when it decides the session has expired.
///
/// The returned future is awaited inside the detector's own task, after
/// the detector has detached itself, so the hook may freely cancel the
/// detector that invoked it.
pub type ExpiryHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as an [`ExpiryHook`].
pub fn hook<F, Fut>(f: F) -> ExpiryHook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`. Used for
/// log fields and config values.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Locks a detector slot, ignoring poisoning: the slot only holds task
/// handles and counters, which stay consistent even if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
