//! Error types for the session layer.

use railpass_protocol::ProtocolError;

/// Errors produced by the auth backend or by session operations.
///
/// `Clone` because the same failure is both stored in
/// [`SessionState::error`](crate::SessionState) and returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The backend refused the request: unknown user, wrong password,
    /// duplicate registration field. Displayed verbatim so the forms can
    /// match on the backend's wording.
    #[error("{0}")]
    Rejected(String),

    /// The backend could not be reached or timed out.
    #[error("auth backend unavailable: {0}")]
    Unavailable(String),

    /// The backend replied with something that is not a valid auth response.
    #[error("malformed auth response: {0}")]
    MalformedResponse(String),

    /// The operation needs a signed-in user and there is none.
    #[error("no authenticated user")]
    NotAuthenticated,
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Rejected(message) => Self::Rejected(message),
            other => Self::MalformedResponse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_displays_backend_message_verbatim() {
        let err = SessionError::Rejected("incorrect password".into());
        assert_eq!(err.to_string(), "incorrect password");
    }

    #[test]
    fn test_from_protocol_rejected_keeps_message() {
        let err: SessionError = ProtocolError::Rejected("user not found".into()).into();
        assert_eq!(err, SessionError::Rejected("user not found".into()));
    }

    #[test]
    fn test_from_protocol_missing_principal_is_malformed() {
        let err: SessionError = ProtocolError::MissingPrincipal.into();
        assert!(matches!(err, SessionError::MalformedResponse(_)));
    }
}
