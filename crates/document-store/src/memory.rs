use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentQuery, Result, StoreError, Version,
    store::{DocumentStore, PutOptions, validate_document_for_put},
};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    document: Document,
}

#[derive(Debug, Default)]
struct Documents {
    by_key: HashMap<(String, String), StoredDocument>,
    next_seq: u64,
}

#[derive(Debug, Default)]
struct Faults {
    failing_collections: HashSet<String>,
    latency: Option<Duration>,
}

/// In-memory document store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation, plus fault
/// injection (failing writes, added latency) for exercising error paths.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Documents>>,
    faults: Arc<RwLock<Faults>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.by_key.len()
    }

    /// Makes every subsequent write to `collection` fail with `Unavailable`.
    pub async fn fail_puts_to(&self, collection: &str) {
        self.faults
            .write()
            .await
            .failing_collections
            .insert(collection.to_string());
    }

    /// Delays every subsequent call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.faults.write().await.latency = latency;
    }

    /// Removes all injected faults.
    pub async fn clear_faults(&self) {
        let mut faults = self.faults.write().await;
        faults.failing_collections.clear();
        faults.latency = None;
    }

    async fn simulate_latency(&self) {
        let latency = self.faults.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn matches(document: &Document, query: &DocumentQuery) -> bool {
        if document.collection != query.collection {
            return false;
        }
        if let Some(ref owner) = query.owner
            && document.owner.as_ref() != Some(owner)
        {
            return false;
        }
        if let Some((ref name, ref value)) = query.field
            && document.field(name) != Some(value.as_str())
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.simulate_latency().await;

        let store = self.documents.read().await;
        Ok(store
            .by_key
            .get(&(collection.to_string(), id.to_string()))
            .map(|stored| stored.document.clone()))
    }

    async fn put(&self, mut document: Document, options: PutOptions) -> Result<Version> {
        validate_document_for_put(&document)?;
        self.simulate_latency().await;

        if self
            .faults
            .read()
            .await
            .failing_collections
            .contains(&document.collection)
        {
            return Err(StoreError::Unavailable(format!(
                "writes to {} are failing",
                document.collection
            )));
        }

        let mut store = self.documents.write().await;
        let key = (document.collection.clone(), document.id.clone());
        let existing = store.by_key.get(&key);

        let current_version = existing
            .map(|stored| stored.document.version)
            .unwrap_or(Version::initial());

        // Check expected version if specified
        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                collection: document.collection,
                id: document.id,
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        let seq = match existing {
            Some(stored) => {
                document.created_at = stored.document.created_at;
                stored.seq
            }
            None => {
                store.next_seq += 1;
                store.next_seq
            }
        };
        document.version = new_version;
        document.updated_at = Utc::now();

        store.by_key.insert(key, StoredDocument { seq, document });
        Ok(new_version)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        self.simulate_latency().await;

        let store = self.documents.read().await;
        let mut matching: Vec<_> = store
            .by_key
            .values()
            .filter(|stored| Self::matches(&stored.document, &query))
            .collect();
        matching.sort_by_key(|stored| stored.seq);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|stored| stored.document.clone())
            .collect())
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        self.simulate_latency().await;

        let store = self.documents.read().await;
        let count = store
            .by_key
            .values()
            .filter(|stored| Self::matches(&stored.document, &query))
            .count();
        Ok(count as u64)
    }
}
