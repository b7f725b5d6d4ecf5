//! [`AuthBackend`] over the booking service's REST API.
//!
//! | Operation      | Request                   |
//! |----------------|---------------------------|
//! | `login`        | `POST /auth/login`        |
//! | `logout`       | `POST /auth/logout`       |
//! | `register`     | `POST /auth/register`     |
//! | `current_user` | `GET  /auth/currentUser`  |
//!
//! The session lives in a cookie, so the client keeps a cookie store and
//! replays it on every call. Bodies are decoded whatever the status code:
//! a rejected login is a 4xx that still carries the usual envelope.

use railpass_protocol::{ApiResponse, Codec, Credentials, JsonCodec, Principal, Registration};
use railpass_session::{AuthBackend, SessionError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::unavailable;
use crate::{HttpConfig, HttpError};

const JSON: &str = "application/json";

/// Cookie-carrying REST client for the auth endpoints.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
    codec: JsonCodec,
}

impl HttpAuthBackend {
    /// # Errors
    /// [`HttpError`] if the base URL is invalid or the client cannot be
    /// built.
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        let base_url = config.normalized_base_url()?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()?;
        info!(%base_url, timeout_ms = config.timeout_ms, "HTTP auth backend ready");
        Ok(Self {
            client,
            base_url,
            codec: JsonCodec,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(StatusCode, ApiResponse), SessionError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, JSON);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, JSON)
                .body(self.codec.encode(body)?);
        }

        let response = request.send().await.map_err(unavailable)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(unavailable)?;
        debug!(%method, path, status = status.as_u16(), "auth request completed");

        if bytes.is_empty() {
            let envelope = ApiResponse {
                success: status.is_success(),
                ..ApiResponse::default()
            };
            return Ok((status, envelope));
        }

        match self.codec.decode::<ApiResponse>(&bytes) {
            Ok(envelope) => Ok((status, envelope)),
            Err(_) if status.is_server_error() => {
                warn!(path, status = status.as_u16(), "auth server error");
                Err(SessionError::Unavailable(format!("server returned {status}")))
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl AuthBackend for HttpAuthBackend {
    async fn login(&self, phone_number: &str, password: &str) -> Result<Principal, SessionError> {
        let credentials = Credentials::new(phone_number, password);
        let (_, envelope) = self
            .call(Method::POST, "/auth/login", Some(&credentials))
            .await?;
        Ok(envelope.into_principal("login failed")?)
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let (_, envelope) = self
            .call::<()>(Method::POST, "/auth/logout", None)
            .await?;
        Ok(envelope.into_ack("logout failed")?)
    }

    async fn register(&self, registration: &Registration) -> Result<Principal, SessionError> {
        let (_, envelope) = self
            .call(Method::POST, "/auth/register", Some(registration))
            .await?;
        Ok(envelope.into_principal("registration failed")?)
    }

    async fn current_user(&self) -> Result<Option<Principal>, SessionError> {
        let (status, envelope) = self
            .call::<()>(Method::GET, "/auth/currentUser", None)
            .await?;
        if status == StatusCode::UNAUTHORIZED || !envelope.success {
            return Ok(None);
        }
        Ok(Some(envelope.into_principal("session check failed")?))
    }
}
