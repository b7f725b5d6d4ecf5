//! Codec trait and the JSON implementation.
//!
//! The HTTP backend never calls `serde_json` directly: it hands raw
//! response bodies to a [`Codec`], so decoding failures come back as a
//! uniform [`ProtocolError`] no matter which status code the body arrived
//! with.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside a backend that
/// is shared across Tokio tasks for the lifetime of the provider.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. The auth backend speaks JSON only.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiResponse, Credentials};

    #[test]
    fn test_json_codec_decodes_envelope() {
        let body = br#"{"success":true,"message":"ok","user":{"id":"1"}}"#;
        let resp: ApiResponse = JsonCodec.decode(body).unwrap();
        assert!(resp.success);
        assert_eq!(resp.message.as_deref(), Some("ok"));
        assert!(resp.user.is_some());
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<ApiResponse, _> = JsonCodec.decode(b"<html>502</html>");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encodes_credentials_as_backend_expects() {
        let bytes = JsonCodec
            .encode(&Credentials::new("13800138000", "pw"))
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"phoneNumber\":\"13800138000\""));
    }
}
