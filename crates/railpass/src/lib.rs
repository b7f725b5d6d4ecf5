//! # Railpass
//!
//! Authenticated-session lifecycle for the Railpass train-booking client.
//!
//! A [`SessionProvider`] owns one session: who is signed in, whether a
//! backend call is in flight, and the inactivity timeout that forces a
//! logout when the user walks away. Code running inside the provider's
//! scope reaches the session through [`use_session`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use railpass::prelude::*;
//!
//! # async fn app() -> Result<(), RailpassError> {
//! let backend = HttpAuthBackend::new(HttpConfig::from_env())?;
//! let provider = SessionProvider::builder()
//!     .config(SessionConfig::production())
//!     .build(backend)?;
//!
//! provider.bootstrap().await;
//! provider
//!     .scope(async {
//!         let session = use_session();
//!         if !session.is_authenticated() {
//!             let _ = session.login(&Credentials::new("13800138000", "secret")).await;
//!         }
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod provider;
mod telemetry;

pub use context::{SessionContext, try_use_session, use_session};
pub use error::RailpassError;
pub use provider::{SessionProvider, SessionProviderBuilder};
pub use telemetry::{DEFAULT_LOG_FILTER, init_tracing};

/// Convenience re-exports for the common case.
pub mod prelude {
    pub use crate::{
        RailpassError, SessionContext, SessionProvider, SessionProviderBuilder, init_tracing,
        try_use_session, use_session,
    };
    pub use railpass_http::{HttpAuthBackend, HttpConfig};
    pub use railpass_protocol::{Credentials, Principal, Registration, UserId};
    pub use railpass_session::{
        ActivityHub, AuthBackend, ForcedLogout, HistoryNavigator, MemoryAuthBackend,
        MemoryStorage, Navigator, REDIRECT_DELAY, SessionConfig, SessionError, SessionState,
        SignalStorage, TimeoutSignal, UiEvent,
    };
    pub use railpass_timer::{SchedulerState, WATCHDOG_CADENCE};
}
