//! The observable session record and the actions that move it.
//!
//! [`SessionState::apply`] is a pure transition function: no I/O, no
//! timers. The controller applies an action and then performs whatever
//! side effects the resulting change implies (starting or stopping the
//! inactivity detectors).

use std::fmt;

use railpass_protocol::Principal;
use serde::Serialize;

/// What subscribers see.
///
/// ## Invariants
///
/// - `is_authenticated` implies `user.is_some()`.
/// - A fresh provider starts from [`SessionState::default`]: no user,
///   not authenticated, not loading, no error.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<Principal>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// A backend call started (login, register, session check).
    Request,
    /// The backend confirmed a user: sign them in.
    Succeeded(Principal),
    /// A backend call failed with this message.
    Failed(String),
    /// Registration went through. The user is not signed in by it.
    Registered,
    /// Replace the signed-in user's record.
    UserUpdated(Principal),
    /// A forced logout started. Marks the session unauthenticated (so the
    /// UI stops treating it as live) but keeps the user record until
    /// [`SessionAction::LoggedOut`].
    LogoutPending,
    /// Back to the initial state.
    LoggedOut,
}

impl SessionAction {
    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
            Self::Registered => "registered",
            Self::UserUpdated(_) => "user_updated",
            Self::LogoutPending => "logout_pending",
            Self::LoggedOut => "logged_out",
        }
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SessionState {
    /// Applies one action.
    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::Request => {
                self.loading = true;
                self.error = None;
            }
            SessionAction::Succeeded(user) => {
                self.user = Some(user);
                self.is_authenticated = true;
                self.loading = false;
                self.error = None;
            }
            SessionAction::Failed(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            SessionAction::Registered => {
                self.loading = false;
            }
            SessionAction::UserUpdated(user) => {
                self.user = Some(user);
            }
            SessionAction::LogoutPending => {
                self.is_authenticated = false;
            }
            SessionAction::LoggedOut => *self = Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn alice() -> Principal {
        Principal::from_value(json!({ "id": "1", "phoneNumber": "13800138000" })).unwrap()
    }

    fn signed_in() -> SessionState {
        let mut state = SessionState::default();
        state.apply(SessionAction::Succeeded(alice()));
        state
    }

    #[test]
    fn test_request_sets_loading_and_clears_error() {
        let mut state = SessionState {
            error: Some("old".into()),
            ..SessionState::default()
        };
        state.apply(SessionAction::Request);
        assert!(state.loading);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_succeeded_signs_in() {
        let mut state = SessionState::default();
        state.apply(SessionAction::Request);
        state.apply(SessionAction::Succeeded(alice()));

        assert!(state.is_authenticated);
        assert!(!state.loading);
        assert_eq!(state.user, Some(alice()));
    }

    #[test]
    fn test_failed_records_error_and_keeps_user_out() {
        let mut state = SessionState::default();
        state.apply(SessionAction::Request);
        state.apply(SessionAction::Failed("incorrect password".into()));

        assert!(!state.loading);
        assert!(!state.is_authenticated);
        assert_eq!(state.error.as_deref(), Some("incorrect password"));
    }

    #[test]
    fn test_registered_only_clears_loading() {
        let mut state = SessionState::default();
        state.apply(SessionAction::Request);
        state.apply(SessionAction::Registered);

        assert!(!state.loading);
        assert!(!state.is_authenticated);
        assert_eq!(state.user, None);
    }

    #[test]
    fn test_logout_pending_keeps_user_until_logged_out() {
        let mut state = signed_in();
        state.apply(SessionAction::LogoutPending);
        assert!(!state.is_authenticated);
        assert!(state.user.is_some());

        state.apply(SessionAction::LoggedOut);
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_user_updated_replaces_record() {
        let mut state = signed_in();
        let mut updated = alice();
        let serde_json::Value::Object(partial) = json!({ "realName": "Alice" }) else {
            unreachable!()
        };
        updated.merge(partial);

        state.apply(SessionAction::UserUpdated(updated.clone()));
        assert_eq!(state.user, Some(updated));
        assert!(state.is_authenticated);
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(SessionState::default()).unwrap();
        assert_eq!(
            value,
            json!({ "user": null, "isAuthenticated": false, "loading": false, "error": null })
        );
    }
}
