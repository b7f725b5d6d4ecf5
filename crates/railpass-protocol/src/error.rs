//! Error types for the protocol layer.
//!
//! Each crate in Railpass defines its own error enum. A `ProtocolError`
//! means the bytes from the backend could not be turned into something
//! the session layer understands, or the backend said "no".

/// Errors that can occur while encoding requests or decoding responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or a body that isn't the response envelope at all.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The backend answered with `success: false`.
    ///
    /// The message is the backend's own wording and is displayed
    /// verbatim, because the login and registration forms match on it
    /// to decide which field to highlight.
    #[error("{0}")]
    Rejected(String),

    /// The backend reported success but left out the `user` record.
    #[error("response is missing the user record")]
    MissingPrincipal,

    /// The message decoded but violates the envelope's rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
