//! Outbound email.
//!
//! OTP codes are delivered through the Resend HTTP API. [`EmailSender`] is the seam the
//! OTP flow depends on; [`LogEmailSender`] stands in for local runs without an API key.

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const DEFAULT_MAIL_FROM: &str = "ProPricing <noreply@proplugin.com>";
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

pub const OTP_SUBJECT: &str = "Your OTP Code";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Missing RESEND_API_KEY")]
    MissingApiKey,
    #[error("Resend send failed: {status} {body}")]
    Upstream { status: u16, body: String },
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    /// Message carrying a password reset code.
    #[must_use]
    pub fn otp(to: &str, code: &str) -> Self {
        let html = format!(
            "<div style=\"font-family:Arial,sans-serif;line-height:1.5\">\
             <h2>Your ProPricing OTP</h2>\
             <p>Use this 6-digit code to reset your password. It expires in 10 minutes.</p>\
             <div style=\"font-size:28px;font-weight:bold;letter-spacing:6px\">{code}</div>\
             <p style=\"color:#666\">If you didn't request this, you can ignore this email.</p>\
             </div>"
        );
        Self {
            to: to.to_string(),
            subject: OTP_SUBJECT.to_string(),
            html,
        }
    }
}

/// Email delivery abstraction used by the OTP flow.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Whether the sender has what it needs to deliver. Checked before any work is done.
    fn is_configured(&self) -> bool;

    /// Deliver a message.
    ///
    /// # Errors
    /// Returns an error if the message could not be handed to the provider.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            html = %message.html,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct ResendConfig {
    api_url: String,
    api_key: Option<SecretString>,
    from: String,
}

impl ResendConfig {
    #[must_use]
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_url: DEFAULT_RESEND_API_URL.to_string(),
            api_key: api_key.filter(|key| !key.expose_secret().trim().is_empty()),
            from: DEFAULT_MAIL_FROM.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    #[must_use]
    pub fn sender(&self) -> &str {
        &self.from
    }
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Debug)]
pub struct ResendSender {
    client: Client,
    config: ResendConfig,
}

impl ResendSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ResendConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    fn is_configured(&self) -> bool {
        self.config.has_api_key()
    }

    #[instrument(skip_all, fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let api_key = self.config.api_key.as_ref().ok_or(MailError::MissingApiKey)?;
        let body = json!({
            "from": self.config.from,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(format!("{}/emails", self.config.api_url))
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        debug!("email accepted by provider");
        Ok(())
    }
}
