//! The seam between the session layer and whatever actually authenticates
//! users.
//!
//! The session layer never talks HTTP itself. It calls an [`AuthBackend`],
//! which production wires to the REST API (`railpass-http`) and tests wire
//! to [`MemoryAuthBackend`](crate::MemoryAuthBackend) or a scripted double.
//!
//! # Trait shape
//!
//! Methods return `impl Future + Send` rather than being `async fn` so the
//! futures are guaranteed `Send` and can be awaited from inside detector
//! tasks on a multi-threaded runtime. Implementors may still write
//! `async fn` in their `impl` block.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use railpass_protocol::{Principal, Registration};

use crate::SessionError;

/// The four calls the session layer makes against the auth service.
///
/// # Example
///
/// ```rust
/// use railpass_protocol::{Principal, Registration};
/// use railpass_session::{AuthBackend, SessionError};
///
/// /// Lets nobody in.
/// struct Closed;
///
/// impl AuthBackend for Closed {
///     async fn login(&self, _phone: &str, _password: &str) -> Result<Principal, SessionError> {
///         Err(SessionError::Rejected("registrations closed".into()))
///     }
///     async fn logout(&self) -> Result<(), SessionError> {
///         Ok(())
///     }
///     async fn register(&self, _form: &Registration) -> Result<Principal, SessionError> {
///         Err(SessionError::Rejected("registrations closed".into()))
///     }
///     async fn current_user(&self) -> Result<Option<Principal>, SessionError> {
///         Ok(None)
///     }
/// }
/// ```
pub trait AuthBackend: Send + Sync + 'static {
    /// Authenticates with a phone number and password.
    ///
    /// # Returns
    /// - `Ok(Principal)`: the backend opened a session for this user
    /// - `Err(SessionError::Rejected)`: unknown user or wrong password
    fn login(
        &self,
        phone_number: &str,
        password: &str,
    ) -> impl Future<Output = Result<Principal, SessionError>> + Send;

    /// Ends the backend session. Callers treat failure as non-fatal.
    fn logout(&self) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Creates an account. Does not sign the new user in.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<Principal, SessionError>> + Send;

    /// Asks the backend who the current session belongs to.
    ///
    /// `Ok(None)` means the backend answered and there is no session.
    fn current_user(
        &self,
    ) -> impl Future<Output = Result<Option<Principal>, SessionError>> + Send;
}

/// Object-safe mirror of [`AuthBackend`], so the controller can hold any
/// backend behind one `Arc` without a type parameter.
pub(crate) trait DynAuthBackend: Send + Sync + 'static {
    fn login<'a>(
        &'a self,
        phone_number: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, SessionError>>;

    fn logout(&self) -> BoxFuture<'_, Result<(), SessionError>>;

    fn register<'a>(
        &'a self,
        registration: &'a Registration,
    ) -> BoxFuture<'a, Result<Principal, SessionError>>;

    fn current_user(&self) -> BoxFuture<'_, Result<Option<Principal>, SessionError>>;
}

impl<B: AuthBackend> DynAuthBackend for B {
    fn login<'a>(
        &'a self,
        phone_number: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Principal, SessionError>> {
        AuthBackend::login(self, phone_number, password).boxed()
    }

    fn logout(&self) -> BoxFuture<'_, Result<(), SessionError>> {
        AuthBackend::logout(self).boxed()
    }

    fn register<'a>(
        &'a self,
        registration: &'a Registration,
    ) -> BoxFuture<'a, Result<Principal, SessionError>> {
        AuthBackend::register(self, registration).boxed()
    }

    fn current_user(&self) -> BoxFuture<'_, Result<Option<Principal>, SessionError>> {
        AuthBackend::current_user(self).boxed()
    }
}
