//! Token lifetimes, signing parameters and lockout thresholds.

use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use std::time::Duration;

const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 30;
const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: u64 = 7;
const DEFAULT_MAX_LOGIN_ATTEMPTS: u64 = 5;
const DEFAULT_LOCKOUT_MINUTES: u64 = 15;

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

/// Parse one of the HMAC algorithms usable with a shared secret.
///
/// # Errors
/// Returns an error for anything other than `HS256`, `HS384` or `HS512`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, String> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(format!("unsupported JWT algorithm: {other}")),
    }
}

#[derive(Clone, Debug)]
pub struct TokenConfig {
    secret: SecretString,
    algorithm: Algorithm,
    access_token_expire_minutes: u64,
    refresh_token_expire_days: u64,
}

impl TokenConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            refresh_token_expire_days: DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
        }
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expire_minutes.saturating_mul(MINUTE))
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expire_days.saturating_mul(DAY))
    }
}

#[derive(Clone, Debug)]
pub struct LockoutConfig {
    max_attempts: u64,
    window_minutes: u64,
    duration_minutes: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            window_minutes: DEFAULT_LOCKOUT_MINUTES,
            duration_minutes: DEFAULT_LOCKOUT_MINUTES,
        }
    }
}

impl LockoutConfig {
    #[must_use]
    pub fn max_attempts(&self) -> u64 {
        self.max_attempts
    }

    /// How long failed attempts keep counting toward a lockout.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_minutes.saturating_mul(MINUTE))
    }

    /// How long a lockout marker blocks logins once set.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_minutes.saturating_mul(MINUTE))
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token: TokenConfig,
    lockout: LockoutConfig,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            token: TokenConfig::new(jwt_secret),
            lockout: LockoutConfig::default(),
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.token.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_access_token_expire_minutes(mut self, minutes: u64) -> Self {
        self.token.access_token_expire_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_refresh_token_expire_days(mut self, days: u64) -> Self {
        self.token.refresh_token_expire_days = days;
        self
    }

    #[must_use]
    pub fn with_max_login_attempts(mut self, attempts: u64) -> Self {
        self.lockout.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_window_minutes(mut self, minutes: u64) -> Self {
        self.lockout.window_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_lockout_duration_minutes(mut self, minutes: u64) -> Self {
        self.lockout.duration_minutes = minutes;
        self
    }

    #[must_use]
    pub fn token(&self) -> &TokenConfig {
        &self.token
    }

    #[must_use]
    pub fn lockout(&self) -> &LockoutConfig {
        &self.lockout
    }
}
