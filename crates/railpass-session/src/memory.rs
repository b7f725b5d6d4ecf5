//! An in-process [`AuthBackend`] with the same rules as the real service.
//!
//! Useful for demos and tests: accounts live in a `HashMap`, one session
//! at a time is tracked by a random token, and every call is counted so
//! tests can assert on what the session layer asked for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use railpass_protocol::{Principal, Registration};
use rand::Rng;
use serde_json::{Map, Value, json};

use crate::{AuthBackend, SessionError, lock};

struct Account {
    password: String,
    principal: Principal,
}

#[derive(Default)]
struct Directory {
    /// Keyed by phone number, the login identifier.
    accounts: HashMap<String, Account>,
    /// Token and phone number of the open session, if any.
    active: Option<(String, String)>,
    next_id: u64,
}

/// Shared-state in-memory auth backend. Clones see the same accounts.
#[derive(Clone, Default)]
pub struct MemoryAuthBackend {
    directory: Arc<Mutex<Directory>>,
    logout_calls: Arc<AtomicUsize>,
    current_user_calls: Arc<AtomicUsize>,
    fail_logout: Arc<AtomicBool>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`seed`](Self::seed).
    pub fn with_account(self, registration: Registration) -> Self {
        // A duplicate seed is a test-setup bug; the first account wins.
        let _ = self.seed(registration);
        self
    }

    /// Adds an account directly, applying the same uniqueness rules as
    /// [`AuthBackend::register`].
    pub fn seed(&self, registration: Registration) -> Result<Principal, SessionError> {
        let mut directory = lock(&self.directory);

        if directory.accounts.contains_key(&registration.phone_number) {
            return Err(SessionError::Rejected(
                "phone number is already registered".into(),
            ));
        }
        if let Some(email) = registration.email.as_deref() {
            let taken = directory
                .accounts
                .values()
                .any(|account| account.principal.get("email").and_then(Value::as_str) == Some(email));
            if taken {
                return Err(SessionError::Rejected("email is already registered".into()));
            }
        }

        directory.next_id += 1;
        let principal = build_principal(directory.next_id, &registration);
        directory.accounts.insert(
            registration.phone_number.clone(),
            Account {
                password: registration.password,
                principal: principal.clone(),
            },
        );
        Ok(principal)
    }

    /// Drops the server-side session, as if it expired on the backend.
    pub fn expire_session(&self) {
        lock(&self.directory).active = None;
    }

    /// The token of the open session, if any.
    pub fn session_token(&self) -> Option<String> {
        lock(&self.directory)
            .active
            .as_ref()
            .map(|(token, _)| token.clone())
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn current_user_calls(&self) -> usize {
        self.current_user_calls.load(Ordering::SeqCst)
    }

    /// Makes `logout` fail with [`SessionError::Unavailable`] (the
    /// server-side session is still dropped).
    pub fn set_logout_failure(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    /// Makes every call fail with [`SessionError::Unavailable`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), SessionError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SessionError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

impl AuthBackend for MemoryAuthBackend {
    async fn login(&self, phone_number: &str, password: &str) -> Result<Principal, SessionError> {
        self.check_reachable()?;
        let mut directory = lock(&self.directory);

        let account = directory
            .accounts
            .get(phone_number)
            .ok_or_else(|| SessionError::Rejected("user not found".into()))?;
        if account.password != password {
            return Err(SessionError::Rejected("incorrect password".into()));
        }
        let principal = account.principal.clone();

        let token = generate_token();
        directory.active = Some((token, phone_number.to_string()));
        tracing::debug!(phone_number, "memory backend opened session");
        Ok(principal)
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        lock(&self.directory).active = None;
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(SessionError::Unavailable("logout endpoint failed".into()));
        }
        Ok(())
    }

    async fn register(&self, registration: &Registration) -> Result<Principal, SessionError> {
        self.check_reachable()?;
        self.seed(registration.clone())
    }

    async fn current_user(&self) -> Result<Option<Principal>, SessionError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let directory = lock(&self.directory);
        let principal = directory
            .active
            .as_ref()
            .and_then(|(_, phone)| directory.accounts.get(phone))
            .map(|account| account.principal.clone());
        Ok(principal)
    }
}

fn build_principal(id: u64, registration: &Registration) -> Principal {
    let mut fields = Map::new();
    fields.insert("id".into(), json!(id.to_string()));
    fields.insert("phoneNumber".into(), json!(registration.phone_number));
    if let Some(name) = &registration.real_name {
        fields.insert("realName".into(), json!(name));
    }
    if let Some(email) = &registration.email {
        fields.insert("email".into(), json!(email));
    }
    if let Some(id_card) = &registration.id_card_number {
        fields.insert("idCardNumber".into(), json!(id_card));
    }
    fields.insert("accountStatus".into(), json!("ACTIVE"));
    for (key, value) in &registration.extra {
        fields.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Principal::new(fields)
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use railpass_protocol::UserId;

    use super::*;

    fn form(phone: &str, email: Option<&str>) -> Registration {
        Registration {
            phone_number: phone.into(),
            password: "password123".into(),
            real_name: Some("Zhang San".into()),
            email: email.map(Into::into),
            ..Registration::default()
        }
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_user_and_wrong_password() {
        let backend = MemoryAuthBackend::new().with_account(form("13800138000", None));

        let err = backend.login("13900000000", "password123").await.unwrap_err();
        assert_eq!(err, SessionError::Rejected("user not found".into()));

        let err = backend.login("13800138000", "nope").await.unwrap_err();
        assert_eq!(err, SessionError::Rejected("incorrect password".into()));
        assert_eq!(backend.session_token(), None);
    }

    #[tokio::test]
    async fn test_login_opens_session_with_hex_token() {
        let backend = MemoryAuthBackend::new().with_account(form("13800138000", None));

        let user = backend.login("13800138000", "password123").await.unwrap();
        assert_eq!(user.id(), Some(UserId("1".into())));

        let token = backend.session_token().expect("session open");
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(backend.current_user().await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let backend = MemoryAuthBackend::new();
        backend
            .register(&form("13800138000", Some("a@example.com")))
            .await
            .unwrap();

        let err = backend.register(&form("13800138000", None)).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(m) if m.contains("phone")));

        let err = backend
            .register(&form("13900139000", Some("a@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Rejected(m) if m.contains("email")));
    }

    #[tokio::test]
    async fn test_register_does_not_sign_in() {
        let backend = MemoryAuthBackend::new();
        backend.register(&form("13800138000", None)).await.unwrap();
        assert_eq!(backend.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_failure_still_drops_session_and_counts() {
        let backend = MemoryAuthBackend::new().with_account(form("13800138000", None));
        backend.login("13800138000", "password123").await.unwrap();
        backend.set_logout_failure(true);

        assert!(backend.logout().await.is_err());
        assert_eq!(backend.logout_calls(), 1);
        assert_eq!(backend.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_fails_every_call() {
        let backend = MemoryAuthBackend::new();
        backend.set_unreachable(true);
        assert!(matches!(
            backend.current_user().await,
            Err(SessionError::Unavailable(_))
        ));
    }

    #[test]
    fn test_generate_token_is_random() {
        assert_ne!(generate_token(), generate_token());
    }
}
