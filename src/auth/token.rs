//! Signed access and refresh tokens.

use super::{config::TokenConfig, error::AuthError, identity::Identity};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ulid::Ulid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims embedded in every token.
///
/// `jti` and `iat` make two tokens for the same identity differ even when
/// minted within the same second.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    /// Numeric identity id carried in `sub`.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret().expose_secret().as_bytes());
        Self {
            config,
            encoding_key,
        }
    }

    /// # Errors
    /// Returns [`AuthError::Signing`] if the token cannot be encoded.
    pub fn issue_access(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue_at(identity, TokenKind::Access, Utc::now().timestamp())
    }

    /// # Errors
    /// Returns [`AuthError::Signing`] if the token cannot be encoded.
    pub fn issue_refresh(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue_at(identity, TokenKind::Refresh, Utc::now().timestamp())
    }

    #[must_use]
    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.config.access_token_ttl(),
            TokenKind::Refresh => self.config.refresh_token_ttl(),
        }
    }

    /// Sign a token as if minted at `issued_at` (unix seconds).
    pub(crate) fn issue_at(
        &self,
        identity: &Identity,
        kind: TokenKind,
        issued_at: i64,
    ) -> Result<String, AuthError> {
        let lifetime = i64::try_from(self.lifetime(kind).as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            kind,
            exp: issued_at.saturating_add(lifetime),
            iat: issued_at,
            jti: Ulid::new().to_string(),
        };

        encode(
            &Header::new(self.config.algorithm()),
            &claims,
            &self.encoding_key,
        )
        .map_err(AuthError::Signing)
    }
}
