//! One-time passcodes for password reset.
//!
//! Per email the lifecycle is `NoOtp -> Pending -> Consumed`, with `Pending -> Expired`
//! evaluated lazily at reset time. The pending state is the `otps` entry of the stored
//! document: the SHA-256 of the code plus an expiry. The plaintext code only ever
//! exists in memory and in the email sent to the user.
//!
//! Issuing a new code overwrites the previous entry. An expired entry stays in the
//! document until it is overwritten by a new request.

mod code;

pub use self::code::sha256_hex;

use self::code::{digest_matches, generate_code};
use crate::{
    document::{normalize_email, LogEntry, OtpEntry},
    mail::{EmailMessage, EmailSender, MailError},
    store::{DocumentRepository, StoreError},
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Lifetime of an issued code, in milliseconds.
pub const OTP_TTL_MS: i64 = 10 * 60 * 1000;

pub const ACTION_OTP_REQUEST: &str = "OTP_REQUEST";
pub const ACTION_PASSWORD_RESET: &str = "PASSWORD_RESET";

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("No OTP requested")]
    NoOtpRequested,
    #[error("OTP expired")]
    OtpExpired,
    #[error("Invalid OTP")]
    InvalidOtp,
    #[error("Missing RESEND_API_KEY")]
    MissingCredential,
    #[error("Failed to send OTP email: {0}")]
    EmailDeliveryFailed(#[source] MailError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct OtpManager {
    repo: Arc<DocumentRepository>,
    mailer: Arc<dyn EmailSender>,
}

impl OtpManager {
    #[must_use]
    pub fn new(repo: Arc<DocumentRepository>, mailer: Arc<dyn EmailSender>) -> Self {
        Self { repo, mailer }
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn EmailSender {
        self.mailer.as_ref()
    }

    /// Issue a code for `email` and send it.
    ///
    /// The entry is persisted before the email goes out, so a delivery failure leaves a
    /// valid code behind; the user can simply request again.
    ///
    /// # Errors
    /// See [`OtpError`]; an unknown user is reported without touching the document.
    #[instrument(skip(self))]
    pub async fn request(&self, email: &str) -> Result<(), OtpError> {
        if !self.mailer.is_configured() {
            return Err(OtpError::MissingCredential);
        }
        let target = normalize_email(email);
        if target.is_empty() {
            return Err(OtpError::InvalidRequest("Email required"));
        }

        let code = generate_code();
        let entry = OtpEntry::new(sha256_hex(&code), now_millis() + OTP_TTL_MS);

        self.repo
            .update(|doc| {
                let user = doc.find_user(&target).ok_or(OtpError::UserNotFound)?;
                let actor = user.username.clone().unwrap_or_else(|| target.clone());
                doc.insert_otp(target.clone(), entry);
                doc.push_log(LogEntry::now(actor, ACTION_OTP_REQUEST, target.as_str()));
                Ok::<_, OtpError>(())
            })
            .await?;

        info!("OTP issued");

        self.mailer
            .send(&EmailMessage::otp(&target, &code))
            .await
            .map_err(|err| {
                warn!("OTP email delivery failed: {err}");
                OtpError::EmailDeliveryFailed(err)
            })
    }

    /// Consume a code and set the new password hash.
    ///
    /// Expired and mismatching codes leave the document untouched.
    ///
    /// # Errors
    /// See [`OtpError`].
    #[instrument(skip(self, otp, new_password_hash))]
    pub async fn reset(
        &self,
        email: &str,
        otp: &str,
        new_password_hash: &str,
    ) -> Result<(), OtpError> {
        let target = normalize_email(email);
        let otp = otp.trim();
        if target.is_empty() {
            return Err(OtpError::InvalidRequest("Email required"));
        }
        if otp.is_empty() {
            return Err(OtpError::InvalidRequest("OTP required"));
        }
        if new_password_hash.is_empty() {
            return Err(OtpError::InvalidRequest("newPasswordHash required"));
        }

        let now = now_millis();
        self.repo
            .update(|doc| {
                // an unreadable entry can never match a code
                let entry = doc
                    .otp_entry(&target)
                    .ok_or(OtpError::NoOtpRequested)?
                    .map_err(|_| OtpError::InvalidOtp)?;
                if now > entry.exp {
                    return Err(OtpError::OtpExpired);
                }
                if !digest_matches(otp, &entry.code_hash) {
                    return Err(OtpError::InvalidOtp);
                }

                let user = doc.find_user_mut(&target).ok_or(OtpError::UserNotFound)?;
                user.password_hash = Some(new_password_hash.to_string());
                let actor = user.username.clone().unwrap_or_else(|| target.clone());

                doc.remove_otp(&target);
                doc.push_log(LogEntry::now(actor, ACTION_PASSWORD_RESET, target.as_str()));
                Ok::<_, OtpError>(())
            })
            .await?;

        info!("password reset with OTP");
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
