//! HTTP implementation of the Railpass [`AuthBackend`](railpass_session::AuthBackend).
//!
//! ```rust,no_run
//! use railpass_http::{HttpAuthBackend, HttpConfig};
//!
//! let backend = HttpAuthBackend::new(HttpConfig::from_env())?;
//! # Ok::<(), railpass_http::HttpError>(())
//! ```

mod backend;
mod config;
mod error;

pub use backend::HttpAuthBackend;
pub use config::HttpConfig;
pub use error::HttpError;
