//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run, currently only the API
//! server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_ENVIRONMENT, ARG_PORT, lockout, store, token};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let environment = matches
        .get_one::<String>(ARG_ENVIRONMENT)
        .cloned()
        .unwrap_or_else(|| "production".to_string());

    Ok(Action::Server(Args {
        port,
        dsn,
        environment,
        store: store::Options::parse(matches),
        token: token::Options::parse(matches)?,
        lockout: lockout::Options::parse(matches),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("OWLAUTH_PORT", Some("8081")),
                ("OWLAUTH_DSN", Some("mysql://auth@localhost:3306/users")),
                ("OWLAUTH_JWT_SECRET", Some("env-secret")),
                ("OWLAUTH_ENVIRONMENT", Some("development")),
                ("OWLAUTH_REDIS_URL", Some("redis://localhost:6379/2")),
                ("OWLAUTH_MAX_LOGIN_ATTEMPTS", Some("3")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["owlauth"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 8081);
                    assert_eq!(args.dsn, "mysql://auth@localhost:3306/users");
                    assert_eq!(args.environment, "development");
                    assert_eq!(args.store.redis_url, "redis://localhost:6379/2");
                    assert_eq!(args.token.jwt_secret.expose_secret(), "env-secret");
                    assert_eq!(args.lockout.max_login_attempts, 3);
                }
            },
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        temp_env::with_vars(
            [
                ("OWLAUTH_DSN", Some("mysql://localhost/users")),
                ("OWLAUTH_JWT_SECRET", Some("do-not-print")),
                ("OWLAUTH_REDIS_PASSWORD", Some("redis-pass")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["owlauth"]);
                let rendered = handler(&matches).map(|action| format!("{action:?}"));
                assert!(rendered.is_ok());
                if let Ok(rendered) = rendered {
                    assert!(!rendered.contains("do-not-print"));
                    assert!(!rendered.contains("redis-pass"));
                }
            },
        );
    }
}
