//! Token lifecycle and abuse-mitigation core.
//!
//! Nothing in here knows about HTTP. Handlers in `crate::api` drive
//! [`SessionService`], which composes the smaller pieces:
//!
//! - [`LockoutGuard`] counts failed logins and sets the lockout marker.
//! - [`CredentialVerifier`] checks an email/password pair against the user store.
//! - [`TokenIssuer`] mints signed access and refresh tokens.
//! - [`TokenRegistry`] keeps the active refresh token per user and the blacklist.
//! - [`TokenVerifier`] decodes tokens and answers registry/blacklist questions.
//!
//! Short-lived state lives behind [`KeyValueStore`], so the whole flow can run
//! against [`MemoryStore`] in tests and [`RedisStore`] in production.

mod config;
mod credentials;
mod error;
pub mod identity;
mod lockout;
mod registry;
mod session;
pub mod store;
mod token;
mod verifier;

pub use config::{AuthConfig, LockoutConfig, TokenConfig, parse_algorithm};
pub use credentials::{CredentialError, CredentialVerifier};
pub use error::AuthError;
pub use identity::{
    BcryptVerifier, Identity, IdentityError, IdentityStore, MemoryIdentityStore,
    MySqlIdentityStore, PasswordVerifier,
};
pub use lockout::{FailureOutcome, LockoutGuard};
pub use registry::TokenRegistry;
pub use session::{AccessGrant, Introspection, LoginGrant, SessionService};
pub use store::{KeyValueStore, MemoryStore, RedisStore, StoreError};
pub use token::{Claims, TokenIssuer, TokenKind};
pub use verifier::TokenVerifier;
