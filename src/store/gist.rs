//! GitHub Gist backed document store.
//!
//! The document lives in one named file of a gist. Reads go through
//! `GET /gists/{id}`; the API inlines file content up to a size limit and above it marks
//! the file `truncated` and only provides a `raw_url`, which is then fetched separately.
//! Writes use `PATCH /gists/{id}` touching only the content of the data file.

use super::{DocumentStore, StoreError};
use crate::document::Document;
use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Client, Response,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const DEFAULT_GIST_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GIST_FILE: &str = "proplugin_data.json";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Clone)]
pub struct GistConfig {
    api_url: String,
    gist_id: Option<String>,
    token: Option<SecretString>,
    file_name: String,
}

impl GistConfig {
    #[must_use]
    pub fn new(gist_id: Option<String>, token: Option<SecretString>) -> Self {
        Self {
            api_url: DEFAULT_GIST_API_URL.to_string(),
            gist_id: gist_id.filter(|id| !id.trim().is_empty()),
            token: token.filter(|token| !token.expose_secret().trim().is_empty()),
            file_name: DEFAULT_GIST_FILE.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn has_gist_id(&self) -> bool {
        self.gist_id.is_some()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for GistConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistConfig")
            .field("api_url", &self.api_url)
            .field("gist_id", &self.gist_id)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("file_name", &self.file_name)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug)]
pub struct GistStore {
    client: Client,
    config: GistConfig,
}

impl GistStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GistConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &GistConfig {
        &self.config
    }

    fn gist_url(&self) -> Result<(String, &SecretString), StoreError> {
        match (&self.config.gist_id, &self.config.token) {
            (Some(id), Some(token)) => Ok((format!("{}/gists/{id}", self.config.api_url), token)),
            _ => Err(StoreError::MissingCredentials),
        }
    }

    async fn get_gist(&self) -> Result<Response, StoreError> {
        let (url, token) = self.gist_url()?;
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;
        ensure_success(response, "GitHub Gist fetch").await
    }

    async fn fetch_raw(&self, raw_url: &str) -> Result<String, StoreError> {
        debug!(raw_url, "gist file truncated, fetching raw content");
        let response = self.client.get(raw_url).send().await?;
        let response = ensure_success(response, "GitHub Gist raw fetch").await?;
        Ok(response.text().await?)
    }
}

/// Turn a non-success response into [`StoreError::Upstream`] carrying status and body.
async fn ensure_success(response: Response, operation: &'static str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Upstream {
        operation,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DocumentStore for GistStore {
    fn ensure_configured(&self) -> Result<(), StoreError> {
        self.gist_url().map(|_| ())
    }

    #[instrument(skip(self), fields(file = %self.config.file_name))]
    async fn fetch_document(&self) -> Result<Document, StoreError> {
        let gist: Gist = self.get_gist().await?.json().await?;

        let Some(file) = gist.files.get(&self.config.file_name) else {
            debug!("data file missing from gist, starting from an empty document");
            return Ok(Document::default());
        };

        let content = match (&file.raw_url, file.truncated) {
            (Some(raw_url), true) => self.fetch_raw(raw_url).await?,
            _ => file.content.clone().unwrap_or_default(),
        };

        Document::from_json_str(&content).map_err(StoreError::MalformedPayload)
    }

    #[instrument(skip_all, fields(file = %self.config.file_name))]
    async fn replace_document(&self, document: &Document) -> Result<(), StoreError> {
        let (url, token) = self.gist_url()?;
        let content = document.to_pretty_json().map_err(StoreError::Encode)?;
        let body = json!({
            "files": { self.config.file_name.as_str(): { "content": content } }
        });

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .header(ACCEPT, GITHUB_ACCEPT)
            .json(&body)
            .send()
            .await?;
        ensure_success(response, "GitHub Gist save").await?;

        debug!("gist file updated");
        Ok(())
    }

    async fn probe(&self) -> Result<(), StoreError> {
        self.get_gist().await.map(|_| ())
    }
}
