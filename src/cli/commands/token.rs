use crate::auth::parse_algorithm;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, builder::ValueParser};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ALGORITHM: &str = "jwt-algorithm";
pub const ARG_ACCESS_TOKEN_EXPIRE_MINUTES: &str = "access-token-expire-minutes";
pub const ARG_REFRESH_TOKEN_EXPIRE_DAYS: &str = "refresh-token-expire-days";

// one year
const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 525_600;
// ten years
const MAX_REFRESH_TOKEN_EXPIRE_DAYS: u64 = 3_650;

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: u64,
    pub refresh_token_expire_days: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .context("missing required argument: --jwt-secret")?;

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            algorithm: matches
                .get_one::<Algorithm>(ARG_JWT_ALGORITHM)
                .copied()
                .unwrap_or(Algorithm::HS256),
            access_token_expire_minutes: matches
                .get_one::<u64>(ARG_ACCESS_TOKEN_EXPIRE_MINUTES)
                .copied()
                .unwrap_or(30),
            refresh_token_expire_days: matches
                .get_one::<u64>(ARG_REFRESH_TOKEN_EXPIRE_DAYS)
                .copied()
                .unwrap_or(7),
        })
    }
}

fn validator_algorithm() -> ValueParser {
    ValueParser::from(parse_algorithm)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Shared secret used to sign and verify tokens")
                .env("OWLAUTH_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_ALGORITHM)
                .long(ARG_JWT_ALGORITHM)
                .help("Token signing algorithm: HS256, HS384 or HS512")
                .env("OWLAUTH_JWT_ALGORITHM")
                .default_value("HS256")
                .value_parser(validator_algorithm()),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_EXPIRE_MINUTES)
                .long(ARG_ACCESS_TOKEN_EXPIRE_MINUTES)
                .help("Access token lifetime in minutes")
                .env("OWLAUTH_ACCESS_TOKEN_EXPIRE_MINUTES")
                .default_value("30")
                .value_parser(
                    clap::value_parser!(u64).range(1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES),
                ),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_EXPIRE_DAYS)
                .long(ARG_REFRESH_TOKEN_EXPIRE_DAYS)
                .help("Refresh token lifetime in days")
                .env("OWLAUTH_REFRESH_TOKEN_EXPIRE_DAYS")
                .default_value("7")
                .value_parser(
                    clap::value_parser!(u64).range(1..=MAX_REFRESH_TOKEN_EXPIRE_DAYS),
                ),
        )
}
