//! Route handlers.
//!
//! Every handler reports failures through [`ApiError`], so clients always get a JSON
//! `{"error": "..."}` body.

pub mod data;
pub mod health;
pub mod otp;
pub mod root;
pub mod save;

use crate::api::error::ApiError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every successful write.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub(crate) const fn ok() -> Self {
        Self { ok: true }
    }
}

/// Fallback for known paths hit with a verb they do not serve.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
