use crate::{
    api::{self, AppState, HealthEnv},
    cli::telemetry,
    mail::{EmailSender, LogEmailSender, ResendConfig, ResendSender},
    otp::OtpManager,
    store::{DocumentRepository, DocumentStore, GistConfig, GistStore, MemoryStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub gist_id: Option<String>,
    pub github_token: Option<SecretString>,
    pub gist_file: String,
    pub gist_api_url: String,
    pub memory_store: bool,
    pub resend_api_key: Option<SecretString>,
    pub mail_from: String,
    pub resend_api_url: String,
    pub mail_log_only: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a URL is invalid, an HTTP client cannot be built or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    Url::parse(&args.gist_api_url)
        .with_context(|| format!("Invalid gist API URL: {}", args.gist_api_url))?;
    Url::parse(&args.resend_api_url)
        .with_context(|| format!("Invalid Resend API URL: {}", args.resend_api_url))?;

    let gist_config = GistConfig::new(args.gist_id, args.github_token)
        .with_api_url(args.gist_api_url)
        .with_file_name(args.gist_file);
    let resend_config = ResendConfig::new(args.resend_api_key)
        .with_api_url(args.resend_api_url)
        .with_from(args.mail_from);

    let env = HealthEnv::new(
        gist_config.has_gist_id(),
        gist_config.has_token(),
        gist_config.file_name(),
        resend_config.has_api_key(),
    );

    let store: Arc<dyn DocumentStore> = if args.memory_store {
        warn!("Using the in-memory document store, data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(GistStore::new(gist_config).context("Failed to build gist client")?)
    };

    let mailer: Arc<dyn EmailSender> = if args.mail_log_only {
        warn!("OTP emails are logged, not sent");
        Arc::new(LogEmailSender)
    } else {
        Arc::new(ResendSender::new(resend_config).context("Failed to build Resend client")?)
    };

    let repo = Arc::new(DocumentRepository::new(store));
    let otp = OtpManager::new(repo.clone(), mailer);

    let result = api::new(args.port, AppState::new(repo, otp, env)).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "store",
            if args.memory_store { "memory" } else { "gist" }.to_string(),
        ),
        (
            "gist_id",
            args.gist_id.clone().unwrap_or_else(|| "n/a".to_string()),
        ),
        ("github_token_set", args.github_token.is_some().to_string()),
        ("gist_file", args.gist_file.clone()),
        ("gist_api_url", args.gist_api_url.clone()),
        ("resend_api_key_set", args.resend_api_key.is_some().to_string()),
        ("mail_from", args.mail_from.clone()),
        ("resend_api_url", args.resend_api_url.clone()),
        ("mail_log_only", args.mail_log_only.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn banner() -> String {
    format!(
        "{} - {} - {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
