use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{Document, DocumentQuery, Result, StoreError, Version};

/// Options for writing a document.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Version the stored document must currently have.
    /// If None, the write is an unconditional upsert.
    pub expected_version: Option<Version>,
}

impl PutOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the document not to exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Core trait for document store implementations.
///
/// Every write of a single document is atomic. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by collection and id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Writes a document.
    ///
    /// If `options.expected_version` is set, the write fails with
    /// `ConcurrencyConflict` unless the stored version matches
    /// (`Version::initial()` meaning "must not exist").
    ///
    /// Returns the new version of the document.
    async fn put(&self, document: Document, options: PutOptions) -> Result<Version>;

    /// Lists documents matching a query, in insertion order.
    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Counts documents matching a query. `limit` and `offset` are ignored.
    async fn count(&self, query: DocumentQuery) -> Result<u64>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Fetches a document and decodes its body.
    async fn get_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<(T, Version)>> {
        match self.get(collection, id).await? {
            Some(doc) => Ok(Some((doc.decode()?, doc.version))),
            None => Ok(None),
        }
    }

    /// Returns the stored version of a document, if it exists.
    async fn version_of(&self, collection: &str, id: &str) -> Result<Option<Version>> {
        Ok(self.get(collection, id).await?.map(|doc| doc.version))
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a document before writing it.
pub fn validate_document_for_put(document: &Document) -> Result<()> {
    if document.collection.is_empty() {
        return Err(StoreError::InvalidDocument(
            "collection must not be empty".to_string(),
        ));
    }
    if document.id.is_empty() {
        return Err(StoreError::InvalidDocument(
            "document id must not be empty".to_string(),
        ));
    }
    if !document.body.is_object() {
        return Err(StoreError::InvalidDocument(format!(
            "body of {}/{} must be a JSON object",
            document.collection, document.id
        )));
    }
    Ok(())
}
