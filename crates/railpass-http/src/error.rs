use railpass_session::SessionError;

/// Errors raised while setting up the HTTP backend.
///
/// Request-time failures are reported as [`SessionError`]s, since that is
/// what the session layer consumes.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The underlying client could not be built (TLS backend, cookie store).
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The configured base URL is not an absolute http(s) URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Maps a transport failure (connect, timeout, body read) to the session
/// layer's "backend unavailable".
pub(crate) fn unavailable(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Unavailable("request timed out".into())
    } else {
        SessionError::Unavailable(err.to_string())
    }
}
