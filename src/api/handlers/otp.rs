//! `POST /api/otp`: one endpoint, two actions.
//!
//! Fields are read loosely: `otp` may arrive as a JSON number or string, and anything
//! that is not text (or a number) counts as missing.

use super::Ack;
use crate::{
    api::error::{ApiError, ErrorBody},
    otp::OtpManager,
    store::DocumentRepository,
};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    /// `request` or `reset`.
    #[schema(value_type = Option<String>)]
    pub action: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub email: Option<Value>,
    /// Six digit code, as a string or a number. Required by `reset`.
    #[schema(value_type = Option<String>)]
    pub otp: Option<Value>,
    /// Required by `reset`.
    #[schema(value_type = Option<String>)]
    pub new_password_hash: Option<Value>,
}

/// Text form of a loosely typed field; `null`, booleans and containers read as empty.
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

#[utoipa::path(
    post,
    path = "/api/otp",
    request_body = OtpRequest,
    responses (
        (status = 200, description = "Code sent, or password reset", body = Ack),
        (status = 400, description = "Missing or unsupported action, missing field, or no valid code", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 405, description = "Method not allowed", body = ErrorBody),
        (status = 500, description = "Missing credentials, store or email failure", body = ErrorBody),
    ),
    tag = "otp"
)]
// axum handler for otp
#[instrument(skip_all)]
pub async fn otp(
    Extension(repo): Extension<Arc<DocumentRepository>>,
    Extension(manager): Extension<Arc<OtpManager>>,
    payload: Option<Json<OtpRequest>>,
) -> Result<Json<Ack>, ApiError> {
    repo.ensure_configured()?;

    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let action = text(request.action.as_ref());
    let email = text(request.email.as_ref());

    match action.as_str() {
        "" => return Err(ApiError::validation("Missing action")),
        "request" => manager.request(&email).await?,
        "reset" => {
            let otp = text(request.otp.as_ref());
            let new_password_hash = text(request.new_password_hash.as_ref());
            manager.reset(&email, &otp, &new_password_hash).await?;
        }
        _ => return Err(ApiError::validation("Unsupported action")),
    }

    Ok(Json(Ack::ok()))
}
