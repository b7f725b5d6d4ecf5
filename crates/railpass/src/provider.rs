//! `SessionProvider` builder and scope.
//!
//! A provider owns one [`SessionController`] and makes it available to
//! everything running inside its scope through [`use_session`]. Each
//! provider is independent: two providers (two test cases, two embedded
//! apps) never share state, timers, or listeners.
//!
//! [`use_session`]: crate::use_session

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use railpass_protocol::Principal;
use railpass_session::{
    ActivityHub, AuthBackend, Environment, HistoryNavigator, MemoryStorage, Navigator,
    SessionConfig, SessionController, SignalStorage,
};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::RailpassError;
use crate::context::{CURRENT, SessionContext};

/// Builder for configuring a [`SessionProvider`].
///
/// # Example
///
/// ```rust,no_run
/// use railpass::prelude::*;
///
/// # async fn mount() -> Result<(), RailpassError> {
/// let provider = SessionProvider::builder()
///     .config(SessionConfig::production())
///     .build(MemoryAuthBackend::new())?;
///
/// provider
///     .scope(async {
///         let session = use_session();
///         session.check_session().await;
///     })
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct SessionProviderBuilder {
    config: SessionConfig,
    storage: Option<Arc<dyn SignalStorage>>,
    navigator: Option<Arc<dyn Navigator>>,
    activity: Option<ActivityHub>,
    initial_user: Option<Principal>,
    runtime: Option<Handle>,
}

impl SessionProviderBuilder {
    /// Creates a builder with default settings (10 s timeout, in-memory
    /// storage and navigation).
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            storage: None,
            navigator: None,
            activity: None,
            initial_user: None,
            runtime: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for a config with this timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout_ms = SessionConfig::with_timeout(timeout).session_timeout_ms;
        self
    }

    /// Tab-scoped storage for the timeout notice.
    pub fn storage(mut self, storage: impl SignalStorage) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    /// The event target UI input is dispatched to.
    pub fn activity(mut self, hub: ActivityHub) -> Self {
        self.activity = Some(hub);
        self
    }

    /// Starts the provider signed in as `user`, e.g. a principal restored
    /// from a previous page load. Call [`SessionProvider::bootstrap`] to
    /// confirm it with the backend.
    pub fn initial_user(mut self, user: Principal) -> Self {
        self.initial_user = Some(user);
        self
    }

    /// Runtime for the inactivity timers. Defaults to the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the provider around `backend`.
    ///
    /// # Errors
    /// [`RailpassError::NoRuntime`] when no runtime was given and none is
    /// current.
    pub fn build(self, backend: impl AuthBackend) -> Result<SessionProvider, RailpassError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| RailpassError::NoRuntime)?,
        };
        let env = Environment {
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(HistoryNavigator::new())),
            activity: self.activity.unwrap_or_default(),
        };

        let controller = SessionController::with_runtime(backend, self.config, env, runtime);
        if let Some(user) = self.initial_user {
            controller.restore(user);
        }
        info!(
            timeout_ms = controller.config().session_timeout_ms,
            authenticated = controller.is_authenticated(),
            "session provider mounted"
        );

        Ok(SessionProvider {
            context: SessionContext::new(controller),
        })
    }
}

impl Default for SessionProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns a session and scopes it for [`use_session`](crate::use_session).
///
/// Dropping the provider is the unmount: timers stop and listeners detach.
/// The last state stays readable through any [`SessionContext`] clones.
#[derive(Debug)]
pub struct SessionProvider {
    context: SessionContext,
}

impl SessionProvider {
    pub fn builder() -> SessionProviderBuilder {
        SessionProviderBuilder::new()
    }

    pub fn context(&self) -> SessionContext {
        self.context.clone()
    }

    /// Runs `fut` with this provider's session in scope.
    pub fn scope<F: Future>(&self, fut: F) -> impl Future<Output = F::Output> + use<F> {
        CURRENT.scope(self.context.clone(), fut)
    }

    /// Runs `f` with this provider's session in scope.
    pub fn scope_sync<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self.context.clone(), f)
    }

    /// The on-mount session check: asks the backend whether a session
    /// exists and syncs local state. Returns whether a user is signed in.
    pub async fn bootstrap(&self) -> bool {
        let signed_in = self.context.check_current_user().await.is_some();
        debug!(signed_in, "session bootstrap finished");
        signed_in
    }

    /// Explicit unmount. Same as dropping the provider.
    pub fn unmount(self) {}
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.context.controller().teardown();
        info!("session provider unmounted");
    }
}
