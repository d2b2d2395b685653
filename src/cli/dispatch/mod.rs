use crate::cli::{
    actions::{server::Args, Action},
    commands::{gist, mail, ARG_PORT},
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if arguments with defaults are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let gist_file = matches
        .get_one::<String>(gist::ARG_GIST_FILE)
        .cloned()
        .context("missing argument: --gist-file")?;
    let gist_api_url = matches
        .get_one::<String>(gist::ARG_GIST_API_URL)
        .cloned()
        .context("missing argument: --gist-api-url")?;
    let mail_from = matches
        .get_one::<String>(mail::ARG_MAIL_FROM)
        .cloned()
        .context("missing argument: --mail-from")?;
    let resend_api_url = matches
        .get_one::<String>(mail::ARG_RESEND_API_URL)
        .cloned()
        .context("missing argument: --resend-api-url")?;

    Ok(Action::Server(Args {
        port,
        gist_id: matches.get_one::<String>(gist::ARG_GIST_ID).cloned(),
        github_token: secret(matches, gist::ARG_GITHUB_TOKEN),
        gist_file,
        gist_api_url,
        memory_store: matches.get_flag(gist::ARG_MEMORY_STORE),
        resend_api_key: secret(matches, mail::ARG_RESEND_API_KEY),
        mail_from,
        resend_api_url,
        mail_log_only: matches.get_flag(mail::ARG_MAIL_LOG_ONLY),
    }))
}

fn secret(matches: &clap::ArgMatches, id: &str) -> Option<SecretString> {
    matches
        .get_one::<String>(id)
        .map(|value| SecretString::from(value.clone()))
}
