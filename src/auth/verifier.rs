//! Token decoding plus registry and blacklist lookups.

use super::{
    config::TokenConfig,
    error::AuthError,
    registry::TokenRegistry,
    store::StoreError,
    token::Claims,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use tracing::debug;

#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    registry: TokenRegistry,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: &TokenConfig, registry: TokenRegistry) -> Self {
        let mut validation = Validation::new(config.algorithm());
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret().expose_secret().as_bytes()),
            validation,
            registry,
        }
    }

    /// Check signature, algorithm and expiry.
    ///
    /// # Errors
    /// Every rejection is reported as [`AuthError::InvalidOrExpired`].
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!("Token rejected: {err}");
                AuthError::InvalidOrExpired
            })
    }

    /// # Errors
    /// Returns an error if the blacklist cannot be read.
    pub async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        self.registry.is_blacklisted(token).await
    }

    /// True only when `token` is byte-for-byte the registered refresh token of `user_id`.
    ///
    /// # Errors
    /// Returns an error if the registry cannot be read.
    pub async fn is_active_refresh(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        let active = self.registry.active_refresh(user_id).await?;
        Ok(active.as_deref() == Some(token))
    }
}
