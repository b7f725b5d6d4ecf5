//! The hook surface: what a page component sees of the session.

use railpass_protocol::{Credentials, Principal, Registration};
use railpass_session::{
    ActivityHub, ForcedLogout, SessionConfig, SessionController, SessionError, SessionState,
    TimeoutSignal,
};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::RailpassError;

tokio::task_local! {
    pub(crate) static CURRENT: SessionContext;
}

/// A handle on the provider's session. Cheap to clone.
///
/// Obtained with [`use_session`] inside a provider scope, or directly from
/// [`SessionProvider::context`](crate::SessionProvider::context).
#[derive(Debug, Clone)]
pub struct SessionContext {
    controller: SessionController,
}

impl SessionContext {
    pub(crate) fn new(controller: SessionController) -> Self {
        Self { controller }
    }

    // -- reactive state ---------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Re-render trigger: resolves on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.controller.subscribe()
    }

    pub fn user(&self) -> Option<Principal> {
        self.controller.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.controller.is_authenticated()
    }

    pub fn loading(&self) -> bool {
        self.controller.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.controller.state().error
    }

    pub fn config(&self) -> &SessionConfig {
        self.controller.config()
    }

    // -- operations ---------------------------------------------------------

    /// # Errors
    /// The backend's rejection, for the login form to display.
    pub async fn login(&self, credentials: &Credentials) -> Result<Principal, SessionError> {
        self.controller.login(credentials).await
    }

    pub async fn logout(&self) {
        self.controller.logout().await;
    }

    /// # Errors
    /// The backend's rejection, for the registration form to display.
    pub async fn register(&self, registration: &Registration) -> Result<Principal, SessionError> {
        self.controller.register(registration).await
    }

    /// # Errors
    /// [`SessionError::NotAuthenticated`] when nobody is signed in.
    pub fn update_user(&self, partial: Map<String, Value>) -> Result<Principal, SessionError> {
        self.controller.update_user(partial)
    }

    pub async fn check_session(&self) -> bool {
        self.controller.check_session().await
    }

    pub async fn check_current_user(&self) -> Option<Principal> {
        self.controller.check_current_user().await
    }

    pub async fn force_logout(&self) -> ForcedLogout {
        self.controller.force_logout().await
    }

    pub fn update_last_activity(&self) {
        self.controller.update_last_activity();
    }

    pub fn reset_session_timer(&self) {
        self.controller.reset_session_timer();
    }

    // -- host integration ---------------------------------------------------

    /// Where UI input events are dispatched.
    pub fn activity(&self) -> ActivityHub {
        self.controller.activity()
    }

    /// For the login view: the "logged out for inactivity" notice, if one
    /// is pending. Deleted on read.
    pub fn take_timeout_notice(&self) -> Option<TimeoutSignal> {
        self.controller.take_timeout_notice()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }
}

/// The current provider's session.
///
/// # Panics
/// Panics when called outside [`SessionProvider::scope`] or
/// [`SessionProvider::scope_sync`]. Using the hook without a provider is a
/// wiring bug, not a runtime condition; see [`try_use_session`] for the
/// fallible form.
///
/// [`SessionProvider::scope`]: crate::SessionProvider::scope
/// [`SessionProvider::scope_sync`]: crate::SessionProvider::scope_sync
pub fn use_session() -> SessionContext {
    match try_use_session() {
        Ok(context) => context,
        Err(_) => panic!("use_session must be called within a SessionProvider scope"),
    }
}

/// # Errors
/// [`RailpassError::MissingProvider`] outside a provider scope.
pub fn try_use_session() -> Result<SessionContext, RailpassError> {
    CURRENT
        .try_with(SessionContext::clone)
        .map_err(|_| RailpassError::MissingProvider)
}
