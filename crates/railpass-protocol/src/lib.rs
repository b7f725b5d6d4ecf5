//! Wire types for the Railpass auth backend.
//!
//! - **Types** ([`Principal`], [`Credentials`], [`Registration`],
//!   [`UserId`]): what the forms send and what comes back.
//! - **Envelope** ([`ApiResponse`]): the `{ success, message, user }`
//!   wrapper every auth endpoint replies with.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes to types and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! HTTP (bytes) → Protocol (ApiResponse → Principal) → Session (state)
//! ```

mod codec;
mod envelope;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use envelope::ApiResponse;
pub use error::ProtocolError;
pub use types::{Credentials, Principal, Registration, UserId};
