//! Authenticated-session lifecycle for the Railpass booking client.
//!
//! This crate owns everything between "the backend says who you are" and
//! "you have been idle too long, back to the login page":
//!
//! 1. **State**: [`SessionState`] and the [`SessionAction`]s that move it
//! 2. **Backend seam**: the [`AuthBackend`] trait, plus an in-memory
//!    implementation for demos and tests
//! 3. **Activity**: [`ActivityHub`] carries UI input events and
//!    [`ActivityTracker`] turns the relevant ones into clock updates
//! 4. **Forced logout**: [`SessionController`] wires the inactivity
//!    detectors from `railpass-timer` to a single, at-most-once logout
//!    procedure that leaves a [`TimeoutSignal`] for the login page
//!
//! # How it fits in the stack
//!
//! ```text
//! Provider (railpass)      ← scopes one controller per app, hook surface
//!     ↕
//! Session layer (this crate)
//!     ↕                 ↘
//! Timer layer            Protocol layer (Principal, Credentials)
//! ```

mod activity;
mod auth;
mod config;
mod controller;
mod error;
mod memory;
mod navigate;
mod signal;
mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use activity::{ActivityHub, ActivityTracker, ListenerId, UiEvent};
pub use auth::AuthBackend;
pub use config::{REDIRECT_DELAY, SessionConfig};
pub use controller::{Environment, ForcedLogout, LogoutTrigger, SessionController};
pub use error::SessionError;
pub use memory::MemoryAuthBackend;
pub use navigate::{HistoryNavigator, Navigator};
pub use signal::{MemoryStorage, SignalStorage, TIMED_OUT_AT_KEY, TIMED_OUT_KEY, TimeoutSignal};
pub use state::{SessionAction, SessionState};

/// Locks a mutex, ignoring poisoning. Every mutex in this crate guards
/// plain data that no holder leaves half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
