use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

pub const ARG_REDIS_URL: &str = "redis-url";
pub const ARG_REDIS_PASSWORD: &str = "redis-password";

#[derive(Debug)]
pub struct Options {
    pub redis_url: String,
    pub redis_password: Option<SecretString>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            redis_url: matches
                .get_one::<String>(ARG_REDIS_URL)
                .cloned()
                .unwrap_or_else(|| "redis://redis_db:6379/1".to_string()),
            redis_password: matches
                .get_one::<String>(ARG_REDIS_PASSWORD)
                .filter(|password| !password.is_empty())
                .cloned()
                .map(SecretString::from),
        }
    }

    /// Redis URL with the password injected, ready for the client.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed or carry a password.
    pub fn connection_url(&self) -> Result<SecretString> {
        let Some(password) = &self.redis_password else {
            return Ok(SecretString::from(self.redis_url.clone()));
        };

        let mut url = Url::parse(&self.redis_url)
            .with_context(|| format!("Invalid Redis URL: {}", self.redis_url))?;
        url.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting Redis password"))?;

        Ok(SecretString::from(url.to_string()))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REDIS_URL)
                .long(ARG_REDIS_URL)
                .help("Redis URL for lockout counters, refresh registry and blacklist")
                .env("OWLAUTH_REDIS_URL")
                .default_value("redis://redis_db:6379/1"),
        )
        .arg(
            Arg::new(ARG_REDIS_PASSWORD)
                .long(ARG_REDIS_PASSWORD)
                .help("Redis password, injected into the Redis URL")
                .env("OWLAUTH_REDIS_PASSWORD")
                .hide_env_values(true),
        )
}
