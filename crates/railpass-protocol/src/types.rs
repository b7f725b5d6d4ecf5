//! Core types exchanged with the auth backend.
//!
//! Everything here travels "on the wire" between the booking client and
//! the auth service: the credentials a user types into the login form,
//! the registration form, and the principal record the backend hands back
//! once a session exists.
//!
//! Field names follow the backend's JSON conventions (`phoneNumber`,
//! `realName`, ...), so every struct uses `#[serde(rename_all = "camelCase")]`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The backend's identifier for a user account.
///
/// A newtype around `String`: the backend issues ids as strings (`"1"`,
/// `"2"`), and wrapping them keeps a user id from being confused with a
/// phone number or a session token in function signatures.
///
/// `#[serde(transparent)]` serializes it as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// The authenticated user record returned by the backend.
///
/// The session layer treats this as opaque: it stores it, republishes it,
/// and merges partial updates into it, but never interprets more than
/// the id and phone number. Keeping it as a JSON object (rather than a
/// fixed struct) means new profile fields on the backend flow through to
/// the UI without a client release.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(Map<String, Value>);

impl Principal {
    /// Wraps an existing JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Builds a principal from an arbitrary JSON value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ProtocolError::InvalidMessage(format!(
                "principal must be a JSON object, got {other}"
            ))),
        }
    }

    /// The user's id, if the record carries one.
    ///
    /// Numeric ids are accepted too and rendered as strings.
    pub fn id(&self) -> Option<UserId> {
        match self.0.get("id")? {
            Value::String(s) => Some(UserId(s.clone())),
            Value::Number(n) => Some(UserId(n.to_string())),
            _ => None,
        }
    }

    /// The phone number the account is registered under.
    pub fn phone_number(&self) -> Option<&str> {
        self.0.get("phoneNumber").and_then(Value::as_str)
    }

    /// Looks up an arbitrary profile field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Shallow-merges `partial` into this record.
    ///
    /// Keys present in `partial` overwrite existing keys; everything else
    /// is kept. Nested objects are replaced wholesale, not merged.
    pub fn merge(&mut self, partial: Map<String, Value>) {
        for (key, value) in partial {
            self.0.insert(key, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// What the user types into the login form.
///
/// `Debug` is implemented by hand so the password never ends up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub phone_number: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        phone_number: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            phone_number: phone_number.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("phone_number", &self.phone_number)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The registration form.
///
/// The typed fields are the ones every registration carries; anything
/// else the form collects (passenger type, address, ...) rides along in
/// `extra` and is flattened into the same JSON object.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub phone_number: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_card_number: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("phone_number", &self.phone_number)
            .field("password", &"<redacted>")
            .field("real_name", &self.real_name)
            .field("email", &self.email)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn principal(value: Value) -> Principal {
        Principal::from_value(value).expect("object")
    }

    #[test]
    fn test_principal_from_value_rejects_non_object() {
        let err = Principal::from_value(json!(["not", "an", "object"]));
        assert!(matches!(err, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_principal_id_accepts_string_and_number() {
        assert_eq!(
            principal(json!({ "id": "7" })).id(),
            Some(UserId("7".into()))
        );
        assert_eq!(
            principal(json!({ "id": 42 })).id(),
            Some(UserId("42".into()))
        );
        assert_eq!(principal(json!({ "name": "x" })).id(), None);
    }

    #[test]
    fn test_principal_merge_overwrites_only_given_keys() {
        let mut user = principal(json!({
            "id": "1",
            "phoneNumber": "13800138000",
            "realName": "Old Name",
        }));

        let partial = json!({ "realName": "New Name", "email": "a@b.c" });
        let Value::Object(partial) = partial else { unreachable!() };
        user.merge(partial);

        assert_eq!(user.get("realName"), Some(&json!("New Name")));
        assert_eq!(user.get("email"), Some(&json!("a@b.c")));
        assert_eq!(user.phone_number(), Some("13800138000"));
        assert_eq!(user.id(), Some(UserId("1".into())));
    }

    #[test]
    fn test_credentials_serialize_camel_case() {
        let creds = Credentials::new("13800138000", "password123");
        let value = serde_json::to_value(&creds).unwrap();
        assert_eq!(
            value,
            json!({ "phoneNumber": "13800138000", "password": "password123" })
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("13800138000", "hunter2");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_registration_flattens_extra_fields() {
        let mut reg = Registration {
            phone_number: "13900139000".into(),
            password: "pw".into(),
            email: Some("new@example.com".into()),
            ..Registration::default()
        };
        reg.extra.insert("passengerType".into(), json!("ADULT"));

        let value = serde_json::to_value(&reg).unwrap();
        assert_eq!(value["phoneNumber"], json!("13900139000"));
        assert_eq!(value["email"], json!("new@example.com"));
        assert_eq!(value["passengerType"], json!("ADULT"));
        assert!(value.get("realName").is_none());
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId("3".into()).to_string(), "U-3");
    }
}
