use crate::{store::DocumentRepository, GIT_COMMIT_HASH};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Which pieces of configuration are present. Built once at startup; never holds secrets.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthEnv {
    #[serde(rename = "GIST_ID")]
    pub gist_id: bool,
    #[serde(rename = "GITHUB_TOKEN")]
    pub github_token: bool,
    #[serde(rename = "GIST_FILE")]
    pub gist_file: String,
    /// `set` or `missing`.
    #[serde(rename = "RESEND_API_KEY")]
    pub resend_api_key: String,
}

impl HealthEnv {
    #[must_use]
    pub fn new(gist_id: bool, github_token: bool, gist_file: &str, resend_api_key: bool) -> Self {
        Self {
            gist_id,
            github_token,
            gist_file: gist_file.to_string(),
            resend_api_key: if resend_api_key { "set" } else { "missing" }.to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    env: HealthEnv,
    gist_ok: bool,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses (
        (status = 200, description = "Configuration report and store reachability; never fails", body = Health),
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(
    Extension(repo): Extension<Arc<DocumentRepository>>,
    Extension(env): Extension<Arc<HealthEnv>>,
) -> impl IntoResponse {
    let gist_ok = match repo.ensure_configured() {
        Ok(()) => match repo.store().probe().await {
            Ok(()) => true,
            Err(err) => {
                debug!("store probe failed: {err}");
                false
            }
        },
        Err(_) => false,
    };

    let health = Health {
        env: env.as_ref().clone(),
        gist_ok,
    };

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let headers = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse::<HeaderValue>()
    .map(|x_app_header_value| {
        debug!("X-App header: {:?}", x_app_header_value);

        let mut headers = HeaderMap::new();

        headers.insert("X-App", x_app_header_value);

        headers
    })
    .map_err(|err| {
        error!("Failed to parse X-App header: {}", err);
    });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    (headers, Json(health))
}
