//! In-process document store.
//!
//! Keeps the serialized document text in memory, so every fetch goes through the same
//! parse-and-normalize path as the remote store. Used by tests and for local runs
//! without gist credentials.

use super::{DocumentStore, StoreError};
use crate::document::Document;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    content: Mutex<Option<String>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Empty store: behaves like a gist without the data file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with raw file content, which may be legacy or partial.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(content.into())),
            ..Self::default()
        }
    }

    /// Simulate an unreachable backend: every operation fails with a 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw content as last written, if any.
    pub async fn content(&self) -> Option<String> {
        self.content.lock().await.clone()
    }

    /// Parsed view of the stored content, if any.
    pub async fn snapshot(&self) -> Option<Document> {
        let content = self.content.lock().await.clone()?;
        Document::from_json_str(&content).ok()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Upstream {
                operation: "memory store",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_document(&self) -> Result<Document, StoreError> {
        self.check_available()?;
        match self.content.lock().await.as_deref() {
            Some(content) => {
                Document::from_json_str(content).map_err(StoreError::MalformedPayload)
            }
            None => Ok(Document::default()),
        }
    }

    async fn replace_document(&self, document: &Document) -> Result<(), StoreError> {
        self.check_available()?;
        let content = document.to_pretty_json().map_err(StoreError::Encode)?;
        *self.content.lock().await = Some(content);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_content_is_an_empty_document() {
        let store = MemoryStore::new();
        assert_eq!(store.fetch_document().await.unwrap(), Document::default());
    }

    #[tokio::test]
    async fn legacy_content_is_normalized_on_read() {
        let store = MemoryStore::with_content(r#"{"users":[{"email":"a@example.com"}]}"#);
        let doc = store.fetch_document().await.unwrap();
        assert_eq!(doc.users.len(), 1);
        assert_eq!(
            doc.dealer_names
                .get("t2")
                .and_then(serde_json::Value::as_str),
            Some("Dealer T2")
        );
    }

    #[tokio::test]
    async fn malformed_content_is_reported() {
        let store = MemoryStore::with_content("{oops");
        let result = store.fetch_document().await;
        assert!(matches!(result, Err(StoreError::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn writes_are_pretty_printed() {
        let store = MemoryStore::new();
        store.replace_document(&Document::default()).await.unwrap();
        let content = store.content().await.unwrap();
        assert!(content.contains("\n  \"users\": []"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_both_ways() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.fetch_document().await,
            Err(StoreError::Upstream { status: 503, .. })
        ));
        assert!(store.replace_document(&Document::default()).await.is_err());
        assert_eq!(store.write_count(), 0);
    }
}
