use clap::{Arg, ArgMatches, Command};

pub const ARG_MAX_LOGIN_ATTEMPTS: &str = "max-login-attempts";
pub const ARG_LOCKOUT_WINDOW_MINUTES: &str = "lockout-window-minutes";
pub const ARG_LOCKOUT_DURATION_MINUTES: &str = "lockout-duration-minutes";

const MAX_LOGIN_ATTEMPTS: u64 = 1_000;
// one year
const MAX_LOCKOUT_MINUTES: u64 = 525_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub max_login_attempts: u64,
    pub window_minutes: u64,
    pub duration_minutes: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let get = |id: &str, default: u64| matches.get_one::<u64>(id).copied().unwrap_or(default);
        Self {
            max_login_attempts: get(ARG_MAX_LOGIN_ATTEMPTS, 5),
            window_minutes: get(ARG_LOCKOUT_WINDOW_MINUTES, 15),
            duration_minutes: get(ARG_LOCKOUT_DURATION_MINUTES, 15),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAX_LOGIN_ATTEMPTS)
                .long(ARG_MAX_LOGIN_ATTEMPTS)
                .help("Failed logins allowed inside the window before the account is locked")
                .env("OWLAUTH_MAX_LOGIN_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_LOGIN_ATTEMPTS)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_WINDOW_MINUTES)
                .long(ARG_LOCKOUT_WINDOW_MINUTES)
                .help("Minutes during which failed logins are counted")
                .env("OWLAUTH_LOCKOUT_WINDOW_MINUTES")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_LOCKOUT_MINUTES)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_DURATION_MINUTES)
                .long(ARG_LOCKOUT_DURATION_MINUTES)
                .help("Minutes an account stays locked")
                .env("OWLAUTH_LOCKOUT_DURATION_MINUTES")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_LOCKOUT_MINUTES)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockout_defaults() {
        temp_env::with_vars(
            [
                ("OWLAUTH_MAX_LOGIN_ATTEMPTS", None::<&str>),
                ("OWLAUTH_LOCKOUT_WINDOW_MINUTES", None),
                ("OWLAUTH_LOCKOUT_DURATION_MINUTES", None),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                assert_eq!(
                    Options::parse(&matches),
                    Options {
                        max_login_attempts: 5,
                        window_minutes: 15,
                        duration_minutes: 15,
                    }
                );
            },
        );
    }

    #[test]
    fn lockout_overrides_and_zero_rejection() {
        temp_env::with_vars(
            [
                ("OWLAUTH_MAX_LOGIN_ATTEMPTS", Some("3")),
                ("OWLAUTH_LOCKOUT_WINDOW_MINUTES", None),
                ("OWLAUTH_LOCKOUT_DURATION_MINUTES", None),
            ],
            || {
                let command = with_args(Command::new("test"));
                let matches = command.clone().get_matches_from(vec![
                    "test",
                    "--lockout-duration-minutes",
                    "60",
                ]);
                let options = Options::parse(&matches);
                assert_eq!(options.max_login_attempts, 3);
                assert_eq!(options.duration_minutes, 60);

                assert!(
                    command
                        .clone()
                        .try_get_matches_from(vec!["test", "--max-login-attempts", "0"])
                        .is_err()
                );
                assert!(
                    command
                        .try_get_matches_from(vec![
                            "test",
                            "--lockout-window-minutes",
                            "18446744073709551615"
                        ])
                        .is_err()
                );
            },
        );
    }
}
