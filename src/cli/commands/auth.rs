use clap::{Arg, ArgAction, Command, builder::PossibleValuesParser};

use crate::api::MAX_SESSION_TTL_SECONDS;

pub const ARG_ADMIN_SECRET: &str = "admin-secret";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_LOGIN_RATE_LIMIT: &str = "login-rate-limit";

pub fn with_args(command: Command) -> Command {
    let command = with_secret_args(command);
    with_cookie_args(command)
}

fn with_secret_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_ADMIN_SECRET)
            .long(ARG_ADMIN_SECRET)
            .help("Shared admin password checked by POST /api/login")
            .long_help(
                "Shared admin password checked by POST /api/login. Also keys the HMAC that signs the admin-auth cookie, so rotating it signs every admin out.",
            )
            .env("IPE_ADMIN_SECRET")
            .hide_env_values(true)
            .required(true),
    )
}

fn with_cookie_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; production marks the cookie Secure")
                .env("IPE_ADMIN_ENV")
                .default_value("development")
                .value_parser(PossibleValuesParser::new(["development", "production"])),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("admin-auth cookie TTL in seconds (at most one year)")
                .env("IPE_ADMIN_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Login page that unauthenticated page requests are redirected to")
                .env("IPE_ADMIN_LOGIN_PATH")
                .default_value("/login"),
        )
        .arg(
            Arg::new(ARG_LOGIN_RATE_LIMIT)
                .long(ARG_LOGIN_RATE_LIMIT)
                .help("Rate limit login attempts per client IP")
                .env("IPE_ADMIN_LOGIN_RATE_LIMIT")
                .default_value("true")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(bool)),
        )
}
