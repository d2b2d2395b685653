//! The persisted application document and its records.

mod normalize;

pub use self::normalize::{normalize, DEFAULT_DEALER_NAMES, DEFAULT_VERSION};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use thiserror::Error;

/// Maximum number of log entries kept in the document; older entries are evicted.
pub const MAX_LOG_ENTRIES: usize = 3000;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON document: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("invalid document shape: {0}")]
    InvalidShape(#[source] serde_json::Error),
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Everything the application persists, loaded and written back as one unit.
///
/// Fields this crate does not know about are kept in `extra` and written back verbatim.
/// Keyed collections stay JSON objects so their stored key order survives a rewrite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: Value,
    pub users: Vec<User>,
    pub products: Vec<Value>,
    pub templates: Vec<Value>,
    pub dealer_names: Map<String, Value>,
    pub brand_logo_urls: Map<String, Value>,
    pub logo_url: String,
    pub logs: VecDeque<LogEntry>,
    /// Pending codes keyed by normalized email; read through [`Document::otp_entry`].
    pub otps: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pending password reset code for one email address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpEntry {
    /// Lowercase hex SHA-256 of the decimal code.
    pub code_hash: String,
    /// Expiry as Unix epoch milliseconds.
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OtpEntry {
    #[must_use]
    pub fn new(code_hash: String, exp: i64) -> Self {
        Self {
            code_hash,
            exp,
            extra: Map::new(),
        }
    }

    fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("codeHash".to_string(), Value::String(self.code_hash));
        map.insert("exp".to_string(), json!(self.exp));
        map.extend(self.extra);
        Value::Object(map)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ts: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `null` reads like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl LogEntry {
    /// Build an entry stamped with the current UTC time (ISO-8601, millisecond precision).
    #[must_use]
    pub fn now(user: impl Into<String>, action: impl Into<String>, meta: impl Into<String>) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            user: user.into(),
            action: action.into(),
            meta: meta.into(),
            extra: Map::new(),
        }
    }
}

impl User {
    /// Case-insensitive match against an already lowercased email.
    #[must_use]
    pub fn has_email(&self, email_lowercase: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|email| email.to_lowercase() == email_lowercase)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: json!(DEFAULT_VERSION),
            users: Vec::new(),
            products: Vec::new(),
            templates: Vec::new(),
            dealer_names: DEFAULT_DEALER_NAMES
                .iter()
                .map(|(tier, name)| ((*tier).to_string(), Value::String((*name).to_string())))
                .collect(),
            brand_logo_urls: Map::new(),
            logo_url: String::new(),
            logs: VecDeque::new(),
            otps: Map::new(),
            extra: Map::new(),
        }
    }
}

impl Document {
    /// Normalize an arbitrary JSON value and convert it into a typed document.
    ///
    /// # Errors
    /// Returns an error if the value is not an object or a known field has the wrong type.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(raw) = value else {
            return Err(DocumentError::NotAnObject);
        };
        serde_json::from_value(Value::Object(normalize(raw))).map_err(DocumentError::InvalidShape)
    }

    /// Parse stored file content. Empty content is an empty document.
    ///
    /// # Errors
    /// Returns an error if the text is not JSON or does not describe a document.
    pub fn from_json_str(content: &str) -> Result<Self, DocumentError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(content).map_err(DocumentError::Syntax)?;
        Self::from_value(value)
    }

    /// Serialize with two-space indentation, the on-disk format of the data file.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(DocumentError::Serialize)
    }

    #[must_use]
    pub fn find_user(&self, email_lowercase: &str) -> Option<&User> {
        self.users.iter().find(|user| user.has_email(email_lowercase))
    }

    pub fn find_user_mut(&mut self, email_lowercase: &str) -> Option<&mut User> {
        self.users
            .iter_mut()
            .find(|user| user.has_email(email_lowercase))
    }

    /// Pending code for `email`.
    ///
    /// `None` when there is no entry (or it is `null`); `Some(Err(_))` when the stored entry
    /// is not a readable code.
    #[must_use]
    pub fn otp_entry(&self, email_lowercase: &str) -> Option<Result<OtpEntry, DocumentError>> {
        self.otps
            .get(email_lowercase)
            .filter(|value| !value.is_null())
            .map(|value| OtpEntry::deserialize(value).map_err(DocumentError::InvalidShape))
    }

    /// Store `entry` as the pending code for `email`, replacing any previous one.
    pub fn insert_otp(&mut self, email_lowercase: String, entry: OtpEntry) {
        self.otps.insert(email_lowercase, entry.into_value());
    }

    pub fn remove_otp(&mut self, email_lowercase: &str) -> Option<Value> {
        self.otps.remove(email_lowercase)
    }

    /// Prepend a log entry, evicting the oldest once the cap is exceeded.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push_front(entry);
        self.logs.truncate(MAX_LOG_ENTRIES);
    }
}

/// Normalize an email for lookups and as the `otps` key.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
