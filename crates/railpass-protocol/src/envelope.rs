//! The response envelope every auth endpoint replies with.
//!
//! ```json
//! { "success": true, "message": "login ok", "user": { "id": "1", ... } }
//! { "success": false, "message": "incorrect password" }
//! ```
//!
//! The envelope is the same for 2xx and 4xx replies: a rejected login is
//! a `400` whose body still says `success: false` with a message.

use serde::{Deserialize, Serialize};

use crate::{Principal, ProtocolError};

/// A decoded auth response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Principal>,
}

impl ApiResponse {
    /// A rejection carrying the backend's message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            user: None,
        }
    }

    /// Checks the `success` flag, discarding any payload.
    ///
    /// `fallback` is used as the message when the backend rejected the
    /// request without saying why.
    ///
    /// # Errors
    /// [`ProtocolError::Rejected`] when `success` is false.
    pub fn into_ack(self, fallback: &str) -> Result<(), ProtocolError> {
        if self.success {
            Ok(())
        } else {
            Err(ProtocolError::Rejected(
                self.message.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }

    /// Checks the `success` flag and extracts the user record.
    ///
    /// # Errors
    /// - [`ProtocolError::Rejected`] when `success` is false
    /// - [`ProtocolError::MissingPrincipal`] when `success` is true but
    ///   there is no `user`
    pub fn into_principal(self, fallback: &str) -> Result<Principal, ProtocolError> {
        if !self.success {
            return Err(ProtocolError::Rejected(
                self.message.unwrap_or_else(|| fallback.to_string()),
            ));
        }
        self.user.ok_or(ProtocolError::MissingPrincipal)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_into_principal_rejected_uses_backend_message() {
        let resp = ApiResponse::rejected("user not found");
        let err = resp.into_principal("login failed").unwrap_err();
        assert_eq!(err.to_string(), "user not found");
    }

    #[test]
    fn test_into_principal_rejected_without_message_uses_fallback() {
        let resp = ApiResponse {
            success: false,
            ..ApiResponse::default()
        };
        let err = resp.into_principal("login failed").unwrap_err();
        assert!(matches!(err, ProtocolError::Rejected(ref m) if m == "login failed"));
    }

    #[test]
    fn test_into_principal_success_without_user_is_missing() {
        let resp = ApiResponse {
            success: true,
            ..ApiResponse::default()
        };
        assert!(matches!(
            resp.into_principal("x"),
            Err(ProtocolError::MissingPrincipal)
        ));
    }

    #[test]
    fn test_into_ack_ignores_payload() {
        let resp: ApiResponse =
            serde_json::from_value(json!({ "success": true, "message": "bye" }))
                .unwrap();
        assert!(resp.into_ack("logout failed").is_ok());
    }

    #[test]
    fn test_missing_success_field_defaults_to_rejection() {
        let resp: ApiResponse =
            serde_json::from_value(json!({ "message": "gateway timeout" })).unwrap();
        assert!(matches!(
            resp.into_ack("x"),
            Err(ProtocolError::Rejected(ref m)) if m == "gateway timeout"
        ));
    }
}
