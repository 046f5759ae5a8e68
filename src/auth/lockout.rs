//! Failed-login counting and temporary lockout per email.
//!
//! Flow Overview:
//! 1) `check` rejects the attempt outright while a lockout marker exists.
//! 2) `record_failure` atomically bumps the counter (created with the window TTL).
//! 3) Reaching the configured maximum writes the marker with the lockout TTL.
//! 4) `record_success` drops the counter but leaves an existing marker to expire.

use super::{
    config::LockoutConfig,
    store::{KeyValueStore, StoreError},
};
use std::sync::Arc;
use tracing::{debug, warn};

const LOCKOUT_MARKER: &str = "1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailureOutcome {
    pub attempts: u64,
    pub locked: bool,
}

#[derive(Clone)]
pub struct LockoutGuard {
    store: Arc<dyn KeyValueStore>,
    config: LockoutConfig,
}

impl LockoutGuard {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: LockoutConfig) -> Self {
        Self { store, config }
    }

    fn attempts_key(email: &str) -> String {
        format!("login_attempts:{email}")
    }

    fn lockout_key(email: &str) -> String {
        format!("lockout:{email}")
    }

    /// Returns `false` while the email is locked out.
    ///
    /// # Errors
    /// Store failures are returned, never treated as "allowed".
    pub async fn check(&self, email: &str) -> Result<bool, StoreError> {
        let locked = self.store.exists(&Self::lockout_key(email)).await?;
        Ok(!locked)
    }

    /// Count a failed attempt and lock the email once the maximum is reached.
    ///
    /// # Errors
    /// Returns an error if the counter or the marker cannot be written.
    pub async fn record_failure(&self, email: &str) -> Result<FailureOutcome, StoreError> {
        let attempts = self
            .store
            .increment_with_ttl(&Self::attempts_key(email), self.config.window())
            .await?;

        let locked = attempts >= self.config.max_attempts();
        if locked {
            self.store
                .set_with_ttl(
                    &Self::lockout_key(email),
                    LOCKOUT_MARKER,
                    self.config.duration(),
                )
                .await?;
            warn!(
                attempts,
                lockout_seconds = self.config.duration().as_secs(),
                "Account locked after repeated failed logins"
            );
        } else {
            debug!(attempts, "Failed login attempt recorded");
        }

        Ok(FailureOutcome { attempts, locked })
    }

    /// Reset the failure counter after a successful login.
    ///
    /// # Errors
    /// Returns an error if the counter cannot be deleted.
    pub async fn record_success(&self, email: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::attempts_key(email)).await
    }
}
