use crate::{
    api,
    auth::{AuthConfig, BcryptVerifier, MySqlIdentityStore, RedisStore, SessionService},
    cli::commands::{lockout, store, token},
};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use sqlx::mysql::MySqlPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub environment: String,
    pub store: store::Options,
    pub token: token::Options,
    pub lockout: lockout::Options,
}

impl Args {
    fn auth_config(self) -> (AuthConfig, store::Options) {
        let config = AuthConfig::new(self.token.jwt_secret)
            .with_algorithm(self.token.algorithm)
            .with_access_token_expire_minutes(self.token.access_token_expire_minutes)
            .with_refresh_token_expire_days(self.token.refresh_token_expire_days)
            .with_max_login_attempts(self.lockout.max_login_attempts)
            .with_lockout_window_minutes(self.lockout.window_minutes)
            .with_lockout_duration_minutes(self.lockout.duration_minutes);
        (config, self.store)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database or Redis cannot be reached, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let environment = args.environment.clone();

    info!(environment = %environment, "Starting auth service");

    // Connect to the user service database (read only)
    let pool = MySqlPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let (config, store_options) = args.auth_config();
    debug!("Auth config: {:?}", config);

    let redis_url = store_options.connection_url()?;
    let store = RedisStore::connect(redis_url.expose_secret())
        .await
        .context("Failed to connect to Redis")?;

    let session = Arc::new(SessionService::new(
        &config,
        Arc::new(store),
        Arc::new(MySqlIdentityStore::new(pool)),
        Arc::new(BcryptVerifier),
    ));

    api::new(port, session, &environment).await
}
