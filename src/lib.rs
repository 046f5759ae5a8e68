//! # Owlauth (Centralized Authentication Service)
//!
//! `owlauth` authenticates user credentials against the user service database,
//! issues signed access and refresh tokens, and keeps the short-lived security
//! state (failed-login counters, lockouts, refresh registry, revocation
//! blacklist) in Redis.
//!
//! ## Token lifecycle
//!
//! - **Login** issues an access token and a refresh token. The refresh token is
//!   registered as the single active refresh token of the user; a later login
//!   replaces it.
//! - **Refresh** exchanges the registered refresh token for a new access token.
//!   The refresh token itself is not rotated.
//! - **Verify** introspects a token for other services and always answers with
//!   a structured `{ "valid": bool }` result.
//! - **Logout** blacklists a token for its remaining lifetime. Logging out with a
//!   refresh token also clears the registry entry.
//!
//! ## Brute-force lockout
//!
//! Failed logins are counted per email inside a rolling window. Once the count
//! reaches the configured maximum, the email is locked for the lockout duration
//! and every login attempt is rejected with `429`, even with the right password.
//! All expiry is delegated to the store's native key TTLs.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
