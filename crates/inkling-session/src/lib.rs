//! Player identity for Inkling.
//!
//! A player proves who they are with the session token issued when they
//! joined. There is no login and no expiry: possession of the token is the
//! identity. This crate covers:
//!
//! 1. **Issuing** tokens ([`issue_token`])
//! 2. **Resolving** a token to a player ([`Authenticator`],
//!    [`StoreAuthenticator`])
//! 3. **Authorizing** room-scoped actions ([`require_member`],
//!    [`require_admin`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← authorizes every player action through here
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Store Layer (below)    ← looks players up by token
//! ```

mod auth;
mod error;
mod token;

pub use auth::{require_admin, require_member, Authenticator, StoreAuthenticator};
pub use error::SessionError;
pub use token::{issue_token, TOKEN_BYTES};
