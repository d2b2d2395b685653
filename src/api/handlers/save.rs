use super::Ack;
use crate::{
    api::error::{ApiError, ErrorBody},
    document::Document,
    store::DocumentRepository,
};
use axum::{extract::Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

const INVALID_PAYLOAD: &str = "Invalid payload";

#[utoipa::path(
    post,
    path = "/api/save",
    request_body(content = Object, description = "The whole document; absent fields get their defaults"),
    responses (
        (status = 200, description = "Document replaced", body = Ack),
        (status = 400, description = "Body is missing, not an object or has wrongly typed fields", body = ErrorBody),
        (status = 405, description = "Method not allowed", body = ErrorBody),
        (status = 500, description = "Store not configured or unreachable", body = ErrorBody),
    ),
    tag = "data"
)]
// axum handler for save
#[instrument(skip_all)]
pub async fn save(
    Extension(repo): Extension<Arc<DocumentRepository>>,
    payload: Option<Json<Value>>,
) -> Result<Json<Ack>, ApiError> {
    repo.ensure_configured()?;

    let Some(Json(payload)) = payload else {
        return Err(ApiError::validation(INVALID_PAYLOAD));
    };

    let document = Document::from_value(payload).map_err(|err| {
        debug!("rejected payload: {err}");
        ApiError::validation(INVALID_PAYLOAD)
    })?;

    repo.replace(&document).await?;

    Ok(Json(Ack::ok()))
}
