//! Session configuration.

use std::time::Duration;

use railpass_timer::millis;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Pause between committing a forced logout and redirecting to the login
/// page, so subscribers observe the logged-out state before navigation.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(100);

/// Configuration for one session provider.
///
/// Fixed for the lifetime of the provider: the timeout is read once when
/// the controller is built and is not meant to change while a session is
/// active.
///
/// Serialized with camelCase keys so it can be loaded from the same JSON
/// the web client uses (`{ "sessionTimeoutMs": 240000 }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Inactivity allowed before a forced logout, in milliseconds.
    ///
    /// Default: 10 seconds. Production deployments use
    /// [`SessionConfig::production`] (4 minutes).
    pub session_timeout_ms: u64,

    /// Where a forced logout redirects to.
    pub login_path: String,
}

impl SessionConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
    pub const PRODUCTION_TIMEOUT_MS: u64 = 4 * 60 * 1000;
    pub const DEFAULT_LOGIN_PATH: &'static str = "/login";

    /// Default config with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            session_timeout_ms: millis(timeout),
            ..Self::default()
        }
    }

    /// The production profile: 4 minutes of inactivity.
    pub fn production() -> Self {
        Self {
            session_timeout_ms: Self::PRODUCTION_TIMEOUT_MS,
            ..Self::default()
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Fixes values that would make the session unusable.
    ///
    /// - A zero timeout becomes 1 ms (a zero-length timer would log the
    ///   user out in the same tick they logged in).
    /// - An empty login path falls back to `/login`.
    pub fn validated(mut self) -> Self {
        if self.session_timeout_ms == 0 {
            warn!("session_timeout_ms is 0, clamping to 1 ms");
            self.session_timeout_ms = 1;
        }
        if self.login_path.trim().is_empty() {
            warn!("login_path is empty, using {}", Self::DEFAULT_LOGIN_PATH);
            self.login_path = Self::DEFAULT_LOGIN_PATH.to_string();
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            login_path: Self::DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}
