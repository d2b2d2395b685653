use crate::{
    api::error::{ApiError, ErrorBody},
    document::Document,
    store::DocumentRepository,
};
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/api/data",
    responses (
        (status = 200, description = "The whole document, normalized to the current schema", body = Object),
        (status = 405, description = "Method not allowed", body = ErrorBody),
        (status = 500, description = "Store not configured or unreachable", body = ErrorBody),
    ),
    tag = "data"
)]
// axum handler for data
#[instrument(skip_all)]
pub async fn data(
    Extension(repo): Extension<Arc<DocumentRepository>>,
) -> Result<Json<Document>, ApiError> {
    repo.ensure_configured()?;
    let document = repo.load().await?;
    Ok(Json(document))
}
