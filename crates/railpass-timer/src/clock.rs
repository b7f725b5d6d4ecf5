//! The activity clock: when did the user last do something?

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::lock;

/// Shared timestamp of the most recent user activity.
///
/// Cheap to clone; all clones observe the same timestamp. Uses Tokio's
/// `Instant`, so paused-clock tests control it along with every timer.
///
/// The timestamp never moves backwards: [`touch`](Self::touch) keeps the
/// later of the stored and current instants.
#[derive(Debug, Clone)]
pub struct ActivityClock {
    last: Arc<Mutex<Instant>>,
}

impl ActivityClock {
    /// Creates a clock stamped with the current instant.
    pub fn new() -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Records activity now and returns the stored instant.
    pub fn touch(&self) -> Instant {
        let now = Instant::now();
        let mut last = lock(&self.last);
        if now > *last {
            *last = now;
        }
        *last
    }

    /// The instant of the most recent activity.
    pub fn last_activity(&self) -> Instant {
        *lock(&self.last)
    }

    /// Time elapsed since the most recent activity.
    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_activity())
    }

    /// Time left before `timeout` is reached, or zero if it already has.
    pub fn remaining(&self, timeout: Duration) -> Duration {
        timeout.saturating_sub(self.elapsed())
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}
