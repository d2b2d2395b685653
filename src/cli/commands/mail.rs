use crate::mail::{DEFAULT_MAIL_FROM, DEFAULT_RESEND_API_URL};
use clap::{Arg, ArgAction, Command};

pub const ARG_RESEND_API_KEY: &str = "resend-api-key";
pub const ARG_MAIL_FROM: &str = "mail-from";
pub const ARG_RESEND_API_URL: &str = "resend-api-url";
pub const ARG_MAIL_LOG_ONLY: &str = "mail-log-only";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RESEND_API_KEY)
                .long(ARG_RESEND_API_KEY)
                .help("Resend API key used to send OTP emails")
                .env("RESEND_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("Sender address of OTP emails")
                .env("MAIL_FROM")
                .default_value(DEFAULT_MAIL_FROM),
        )
        .arg(
            Arg::new(ARG_RESEND_API_URL)
                .long(ARG_RESEND_API_URL)
                .help("Base URL of the Resend API")
                .env("RESEND_API_URL")
                .default_value(DEFAULT_RESEND_API_URL),
        )
        .arg(
            Arg::new(ARG_MAIL_LOG_ONLY)
                .long(ARG_MAIL_LOG_ONLY)
                .help("Log OTP emails instead of sending them (local development)")
                .env("PROPLUGIN_MAIL_LOG_ONLY")
                .action(ArgAction::SetTrue),
        )
}
