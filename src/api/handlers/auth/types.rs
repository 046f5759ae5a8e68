//! Request/response types for auth endpoints.

use crate::auth::{AccessGrant, Introspection, LoginGrant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TOKEN_TYPE: &str = "bearer";

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// keep the password out of logs
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

impl From<LoginGrant> for LoginResponse {
    fn from(grant: LoginGrant) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: grant.expires_in,
            user_id: grant.user_id,
            username: grant.username,
            email: grant.email,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl From<AccessGrant> for TokenResponse {
    fn from(grant: AccessGrant) -> Self {
        Self {
            access_token: grant.access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: grant.expires_in,
        }
    }
}

/// Body of `/auth/verify` and `/auth/logout`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Introspection> for VerifyTokenResponse {
    fn from(introspection: Introspection) -> Self {
        let Some(claims) = introspection.claims.filter(|_| introspection.valid) else {
            return Self::default();
        };
        Self {
            valid: true,
            user_id: claims.user_id(),
            username: Some(claims.username),
            email: Some(claims.email),
            expires_at: DateTime::from_timestamp(claims.exp, 0),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, TokenKind};
    use anyhow::{Context, Result};

    #[test]
    fn verify_response_omits_claims_when_invalid() -> Result<()> {
        let value = serde_json::to_value(VerifyTokenResponse::from(Introspection::invalid()))?;
        assert_eq!(value, serde_json::json!({ "valid": false }));
        Ok(())
    }

    #[test]
    fn verify_response_formats_expiry_as_rfc3339() -> Result<()> {
        let introspection = Introspection {
            valid: true,
            claims: Some(Claims {
                sub: "3".to_string(),
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                kind: TokenKind::Access,
                exp: 1_700_000_000,
                iat: 1_699_998_200,
                jti: "01H".to_string(),
            }),
        };
        let value = serde_json::to_value(VerifyTokenResponse::from(introspection))?;

        assert_eq!(value.get("user_id"), Some(&serde_json::json!(3)));
        let expires_at = value
            .get("expires_at")
            .and_then(serde_json::Value::as_str)
            .context("missing expires_at")?;
        assert_eq!(expires_at, "2023-11-14T22:13:20Z");
        Ok(())
    }

    #[test]
    fn login_request_debug_hides_password() {
        let request = LoginRequest {
            email: "a@x.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
