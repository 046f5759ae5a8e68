//! Login, refresh, introspection and logout.
//!
//! Flow Overview:
//! 1) Login: lockout gate, credential check, then both tokens are issued and the
//!    refresh token replaces the user's registry entry.
//! 2) Refresh: a registered refresh token of an active user buys a new access
//!    token. The refresh token is not rotated.
//! 3) Verify: blacklist first, then signature and expiry. Never fails.
//! 4) Logout: blacklist the token for its remaining lifetime and, for refresh
//!    tokens, drop the registry entry. Never fails.
//!
//! Security state lookups fail closed: if the store cannot answer, login and
//! refresh fail instead of skipping the check.

use super::{
    config::AuthConfig,
    credentials::{CredentialError, CredentialVerifier},
    error::AuthError,
    identity::{IdentityStore, PasswordVerifier},
    lockout::LockoutGuard,
    registry::TokenRegistry,
    store::KeyValueStore,
    token::{Claims, TokenIssuer, TokenKind},
    verifier::TokenVerifier,
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// Tokens handed out by a successful login.
#[derive(Clone, Debug)]
pub struct LoginGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct AccessGrant {
    pub access_token: String,
    pub expires_in: u64,
}

/// Outcome of introspecting a token; `claims` is only present when valid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Introspection {
    pub valid: bool,
    pub claims: Option<Claims>,
}

impl Introspection {
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            valid: false,
            claims: None,
        }
    }

    fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
        }
    }
}

pub struct SessionService {
    lockout: LockoutGuard,
    credentials: CredentialVerifier,
    issuer: TokenIssuer,
    registry: TokenRegistry,
    verifier: TokenVerifier,
    identities: Arc<dyn IdentityStore>,
    store: Arc<dyn KeyValueStore>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn KeyValueStore>,
        identities: Arc<dyn IdentityStore>,
        passwords: Arc<dyn PasswordVerifier>,
    ) -> Self {
        let registry = TokenRegistry::new(store.clone(), config.token().refresh_token_ttl());
        Self {
            lockout: LockoutGuard::new(store.clone(), config.lockout().clone()),
            credentials: CredentialVerifier::new(identities.clone(), passwords),
            issuer: TokenIssuer::new(config.token().clone()),
            verifier: TokenVerifier::new(config.token(), registry.clone()),
            registry,
            identities,
            store,
        }
    }

    /// Key-value store backing lockouts and the registry, for health checks.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// User record store, for health checks.
    #[must_use]
    pub fn identities(&self) -> &Arc<dyn IdentityStore> {
        &self.identities
    }

    fn access_expires_in(&self) -> u64 {
        self.issuer.lifetime(TokenKind::Access).as_secs()
    }

    /// # Errors
    /// - [`AuthError::RateLimited`] while locked out or when this failure triggers a lockout
    /// - [`AuthError::BadCredential`] for an unknown email or a wrong password
    /// - [`AuthError::InactiveAccount`] for a disabled account with the right password
    /// - backend errors when a store cannot be reached
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, AuthError> {
        if !self.lockout.check(email).await? {
            debug!("Login rejected, account locked");
            return Err(AuthError::RateLimited { just_locked: false });
        }

        let identity = match self.credentials.authenticate(email, password).await {
            Ok(identity) => identity,
            Err(CredentialError::Inactive) => {
                debug!("Login rejected, account inactive");
                return Err(AuthError::InactiveAccount);
            }
            Err(CredentialError::Backend(err)) => return Err(err.into()),
            Err(reason @ (CredentialError::NotFound | CredentialError::BadCredential)) => {
                debug!("Login rejected: {reason}");
                let outcome = self.lockout.record_failure(email).await?;
                return Err(if outcome.locked {
                    AuthError::RateLimited { just_locked: true }
                } else {
                    AuthError::BadCredential
                });
            }
        };

        self.lockout.record_success(email).await?;

        let access_token = self.issuer.issue_access(&identity)?;
        let refresh_token = self.issuer.issue_refresh(&identity)?;
        self.registry
            .store_refresh(identity.id, &refresh_token)
            .await?;

        info!(user_id = identity.id, "User logged in");

        Ok(LoginGrant {
            access_token,
            refresh_token,
            expires_in: self.access_expires_in(),
            user_id: identity.id,
            username: identity.username,
            email: identity.email,
        })
    }

    /// Exchange the registered refresh token for a new access token.
    ///
    /// # Errors
    /// - [`AuthError::InvalidOrExpired`] for a bad, expired, revoked or non-refresh token
    /// - [`AuthError::NotRegistered`] when the token is not the user's active refresh token
    /// - [`AuthError::SubjectUnavailable`] when the user is gone or disabled
    /// - backend errors when a store cannot be reached
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let claims = self.verifier.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            debug!("Refresh rejected, token kind is {}", claims.kind.as_str());
            return Err(AuthError::InvalidOrExpired);
        }
        let user_id = claims.user_id().ok_or(AuthError::InvalidOrExpired)?;

        if self.verifier.is_blacklisted(refresh_token).await? {
            return Err(AuthError::InvalidOrExpired);
        }

        if !self
            .verifier
            .is_active_refresh(user_id, refresh_token)
            .await?
        {
            return Err(AuthError::NotRegistered);
        }

        let identity = self
            .identities
            .find_by_id(user_id)
            .await?
            .filter(|identity| identity.is_active)
            .ok_or(AuthError::SubjectUnavailable)?;

        let access_token = self.issuer.issue_access(&identity)?;

        debug!(user_id, "Access token refreshed");

        Ok(AccessGrant {
            access_token,
            expires_in: self.access_expires_in(),
        })
    }

    /// Introspect `token` for another service.
    pub async fn verify(&self, token: &str) -> Introspection {
        match self.verifier.is_blacklisted(token).await {
            Ok(false) => {}
            Ok(true) => return Introspection::invalid(),
            Err(err) => {
                error!("Blacklist lookup failed, reporting token as invalid: {err}");
                return Introspection::invalid();
            }
        }

        self.verifier
            .decode(token)
            .map_or_else(|_| Introspection::invalid(), Introspection::valid)
    }

    /// Revoke `token`. Unreadable or expired tokens are already unusable and
    /// are accepted as logged out.
    pub async fn logout(&self, token: &str) {
        let Ok(claims) = self.verifier.decode(token) else {
            debug!("Logout with unusable token, nothing to revoke");
            return;
        };

        let remaining = u64::try_from(claims.exp.saturating_sub(Utc::now().timestamp())).unwrap_or(0);
        if remaining > 0 {
            if let Err(err) = self
                .registry
                .blacklist(token, Duration::from_secs(remaining))
                .await
            {
                error!("Failed to blacklist token on logout: {err}");
            }
        }

        if claims.kind == TokenKind::Refresh {
            if let Some(user_id) = claims.user_id() {
                if let Err(err) = self.registry.revoke_refresh(user_id).await {
                    warn!(user_id, "Failed to unregister refresh token on logout: {err}");
                }
            }
        }

        info!(sub = %claims.sub, kind = claims.kind.as_str(), "Token revoked");
    }
}
