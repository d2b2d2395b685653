//! Persistence of the application document.
//!
//! The backing service is a generic "files in a bucket" API with no transactions and no
//! version check on write. [`DocumentStore`] hides that behind two whole-document
//! operations, and [`DocumentRepository`] builds the read-modify-write cycle on top.

mod gist;
mod memory;

pub use self::gist::{GistConfig, GistStore, DEFAULT_GIST_API_URL, DEFAULT_GIST_FILE};
pub use self::memory::MemoryStore;

use crate::document::{Document, DocumentError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing GIST_ID or GITHUB_TOKEN")]
    MissingCredentials,
    #[error("{operation} failed: {status} {body}")]
    Upstream {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid JSON in Gist file")]
    MalformedPayload(#[source] DocumentError),
    #[error("failed to encode document: {0}")]
    Encode(#[source] DocumentError),
}

/// Whole-document persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fail fast when the store cannot be used at all (e.g. credentials are unset).
    ///
    /// # Errors
    /// Returns [`StoreError::MissingCredentials`] when the store is not configured.
    fn ensure_configured(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Load and normalize the current document. A missing file is an empty document.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable, answers with a non-success status
    /// or holds content that is not a JSON document.
    async fn fetch_document(&self) -> Result<Document, StoreError>;

    /// Overwrite the stored document.
    ///
    /// # Errors
    /// Returns an error if the document cannot be encoded or the backend rejects the write.
    async fn replace_document(&self, document: &Document) -> Result<(), StoreError>;

    /// Cheap reachability check used by the health endpoint.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    async fn probe(&self) -> Result<(), StoreError> {
        self.fetch_document().await.map(|_| ())
    }
}

/// Runs read-modify-write cycles against a [`DocumentStore`].
///
/// Cycles issued through the same repository are serialized, so requests served by one
/// process never overwrite each other's changes. Writers in other processes still race
/// with last-writer-wins semantics; the backend offers nothing to detect that.
pub struct DocumentRepository {
    store: Arc<dyn DocumentStore>,
    write_lock: Mutex<()>,
}

impl DocumentRepository {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// # Errors
    /// Returns [`StoreError::MissingCredentials`] when the store is not configured.
    pub fn ensure_configured(&self) -> Result<(), StoreError> {
        self.store.ensure_configured()
    }

    /// Read the current document without writing anything back.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn load(&self) -> Result<Document, StoreError> {
        self.store.fetch_document().await
    }

    /// Replace the whole document.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn replace(&self, document: &Document) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.replace_document(document).await
    }

    /// Fetch, apply `mutate`, and write the result back.
    ///
    /// Nothing is written when `mutate` fails.
    ///
    /// # Errors
    /// Returns the error of `mutate`, or the store failure converted into `E`.
    #[instrument(skip_all)]
    pub async fn update<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.store.fetch_document().await?;
        let output = mutate(&mut document)?;
        self.store.replace_document(&document).await?;
        debug!("document written back");
        Ok(output)
    }
}
