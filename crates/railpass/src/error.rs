//! Unified error type for the Railpass client.

use railpass_http::HttpError;
use railpass_protocol::ProtocolError;
use railpass_session::SessionError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each wrapped variant lets `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum RailpassError {
    /// The session hook was used outside a provider scope.
    #[error("no SessionProvider in scope")]
    MissingProvider,

    /// A provider was built with no Tokio runtime to run its timers on.
    #[error("SessionProvider needs a Tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Http(#[from] HttpError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error_is_transparent() {
        let err: RailpassError = SessionError::Rejected("incorrect password".into()).into();
        assert!(matches!(err, RailpassError::Session(_)));
        assert_eq!(err.to_string(), "incorrect password");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: RailpassError = ProtocolError::MissingPrincipal.into();
        assert!(matches!(err, RailpassError::Protocol(_)));
    }

    #[test]
    fn test_from_http_error() {
        let err: RailpassError = HttpError::InvalidBaseUrl("api".into()).into();
        assert!(matches!(err, RailpassError::Http(_)));
        assert!(err.to_string().contains("api"));
    }
}
