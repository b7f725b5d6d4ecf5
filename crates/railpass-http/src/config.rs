use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::HttpError;

/// Where the auth API lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    /// Prefix for every endpoint, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl HttpConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8080/api";
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
    pub const BASE_URL_ENV: &'static str = "RAILPASS_API_URL";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults, with the base URL taken from `RAILPASS_API_URL` if set.
    pub fn from_env() -> Self {
        match std::env::var(Self::BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The base URL without a trailing slash.
    ///
    /// # Errors
    /// [`HttpError::InvalidBaseUrl`] unless it starts with `http://` or
    /// `https://`.
    pub(crate) fn normalized_base_url(&self) -> Result<String, HttpError> {
        let url = self.base_url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HttpError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(url.to_string())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }
}
