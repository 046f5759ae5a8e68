use super::{identity::IdentityError, store::StoreError};
use thiserror::Error;

/// Failures surfaced by the session operations.
///
/// Token problems are collapsed on purpose: callers learn that a token was
/// rejected, never which check rejected it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    BadCredential,
    #[error("Account is disabled")]
    InactiveAccount,
    #[error("{}", rate_limited_message(.just_locked))]
    RateLimited { just_locked: bool },
    #[error("Invalid or expired token")]
    InvalidOrExpired,
    #[error("Refresh token not found or invalid")]
    NotRegistered,
    #[error("User not found or inactive")]
    SubjectUnavailable,
    #[error("key-value store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("identity store unavailable: {0}")]
    Identity(#[from] IdentityError),
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

fn rate_limited_message(just_locked: &bool) -> &'static str {
    if *just_locked {
        "Too many failed login attempts. Account locked temporarily."
    } else {
        "Account temporarily locked due to too many failed login attempts"
    }
}

impl AuthError {
    /// True for failures of a backing service rather than of the caller's input.
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Identity(_) | Self::Signing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_messages_distinguish_new_lockouts() {
        assert_eq!(
            AuthError::RateLimited { just_locked: true }.to_string(),
            "Too many failed login attempts. Account locked temporarily."
        );
        assert_eq!(
            AuthError::RateLimited { just_locked: false }.to_string(),
            "Account temporarily locked due to too many failed login attempts"
        );
    }

    #[test]
    fn backend_failures_are_flagged() {
        assert!(AuthError::Store(StoreError::Unavailable("down".to_string())).is_backend());
        assert!(!AuthError::BadCredential.is_backend());
        assert!(!AuthError::InvalidOrExpired.is_backend());
    }
}
