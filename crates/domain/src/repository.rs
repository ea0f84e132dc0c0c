//! Typed, timeout-bounded access to the document store.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use document_store::{DocumentQuery, DocumentStore, PutOptions, StoreError, Version};

use crate::entity::Entity;
use crate::error::DomainError;

/// Default bound applied to every storage call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of compare-and-swap attempts before a conflict is surfaced.
const MAX_UPDATE_ATTEMPTS: usize = 3;

/// Repository for one entity type.
///
/// The repository is responsible for:
/// 1. Bounding every store call with a timeout
/// 2. Serializing and deserializing entities
/// 3. Compare-and-swap updates on the document version
pub struct Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    store: S,
    timeout: Duration,
    _phantom: PhantomData<fn() -> E>,
}

impl<S, E> Clone for Repository<S, E>
where
    S: DocumentStore + Clone,
    E: Entity,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            timeout: self.timeout,
            _phantom: PhantomData,
        }
    }
}

impl<S, E> Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    /// Creates a new repository over the given store.
    pub fn new(store: S, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a query over every document of this entity's collection.
    pub fn query_all() -> DocumentQuery {
        DocumentQuery::collection(E::collection())
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = document_store::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(DomainError::from),
            Err(_) => {
                tracing::warn!(
                    operation,
                    collection = E::collection(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "storage call timed out"
                );
                Err(DomainError::Timeout {
                    operation,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Loads an entity and its version, returning None if it doesn't exist.
    pub async fn find(&self, id: &str) -> Result<Option<(E, Version)>, DomainError> {
        let document = self
            .bounded("get", self.store.get(E::collection(), id))
            .await?;
        match document {
            Some(document) => Ok(Some((document.decode()?, document.version))),
            None => Ok(None),
        }
    }

    /// Loads an entity, failing with `NotFound` if it doesn't exist.
    pub async fn get(&self, id: &str) -> Result<E, DomainError> {
        self.find(id)
            .await?
            .map(|(entity, _)| entity)
            .ok_or_else(|| DomainError::not_found(E::entity_name(), id))
    }

    /// Writes a new entity; fails with a concurrency conflict if the id is taken.
    pub async fn insert(&self, entity: &E) -> Result<Version, DomainError> {
        self.save(entity, Version::initial()).await
    }

    /// Writes an entity, expecting the stored document to be at `expected`.
    pub async fn save(&self, entity: &E, expected: Version) -> Result<Version, DomainError> {
        let document = entity.to_document()?;
        self.bounded(
            "put",
            self.store.put(document, PutOptions::expect_version(expected)),
        )
        .await
    }

    /// Lists entities matching a query.
    pub async fn query(&self, query: DocumentQuery) -> Result<Vec<E>, DomainError> {
        let documents = self.bounded("query", self.store.query(query)).await?;
        documents
            .iter()
            .map(|document| document.decode().map_err(DomainError::from))
            .collect()
    }

    /// Counts entities matching a query.
    pub async fn count(&self, query: DocumentQuery) -> Result<u64, DomainError> {
        self.bounded("count", self.store.count(query)).await
    }

    /// Applies `mutate` to an existing entity and writes it back.
    ///
    /// Fails with `NotFound` if the entity doesn't exist.
    pub async fn update<T, F>(&self, id: &str, mutate: F) -> Result<(E, T), DomainError>
    where
        F: FnMut(&mut E) -> Result<T, DomainError>,
    {
        self.modify(id, None::<fn() -> E>, mutate).await
    }

    /// Applies `mutate` to an entity, starting from `init()` if it doesn't exist.
    pub async fn upsert<T, I, F>(&self, id: &str, init: I, mutate: F) -> Result<(E, T), DomainError>
    where
        I: Fn() -> E,
        F: FnMut(&mut E) -> Result<T, DomainError>,
    {
        self.modify(id, Some(init), mutate).await
    }

    async fn modify<T, I, F>(
        &self,
        id: &str,
        init: Option<I>,
        mut mutate: F,
    ) -> Result<(E, T), DomainError>
    where
        I: Fn() -> E,
        F: FnMut(&mut E) -> Result<T, DomainError>,
    {
        let mut attempt = 1;
        loop {
            let (mut entity, version) = match (self.find(id).await?, init.as_ref()) {
                (Some(found), _) => found,
                (None, Some(init)) => (init(), Version::initial()),
                (None, None) => return Err(DomainError::not_found(E::entity_name(), id)),
            };

            let output = mutate(&mut entity)?;

            match self.save(&entity, version).await {
                Ok(_) => return Ok((entity, output)),
                Err(DomainError::Storage(StoreError::ConcurrencyConflict { .. }))
                    if attempt < MAX_UPDATE_ATTEMPTS =>
                {
                    tracing::debug!(
                        collection = E::collection(),
                        id,
                        attempt,
                        "version conflict, retrying update"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        value: u32,
    }

    impl Entity for Counter {
        fn collection() -> &'static str {
            "counters"
        }

        fn entity_name() -> &'static str {
            "Counter"
        }

        fn document_id(&self) -> String {
            self.id.clone()
        }
    }

    fn repository(store: InMemoryDocumentStore) -> Repository<InMemoryDocumentStore, Counter> {
        Repository::new(store, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn insert_find_and_get() {
        let repo = repository(InMemoryDocumentStore::new());
        let counter = Counter {
            id: "c".into(),
            value: 1,
        };

        assert_eq!(repo.insert(&counter).await.unwrap(), Version::first());

        let (found, version) = repo.find("c").await.unwrap().unwrap();
        assert_eq!(found, counter);
        assert_eq!(version, Version::first());

        let missing = repo.get("nope").await;
        assert!(matches!(
            missing,
            Err(DomainError::NotFound { entity: "Counter", .. })
        ));
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let repo = repository(InMemoryDocumentStore::new());
        let init = || Counter {
            id: "c".into(),
            value: 0,
        };

        let (first, _) = repo
            .upsert("c", init, |c| {
                c.value += 1;
                Ok(())
            })
            .await
            .unwrap();
        let (second, returned) = repo
            .upsert("c", init, |c| {
                c.value += 1;
                Ok(c.value)
            })
            .await
            .unwrap();

        assert_eq!(first.value, 1);
        assert_eq!(second.value, 2);
        assert_eq!(returned, 2);
    }

    #[tokio::test]
    async fn update_requires_existing_entity() {
        let repo = repository(InMemoryDocumentStore::new());
        let result = repo.update("c", |c| Ok(c.value)).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn mutation_errors_are_not_persisted() {
        let repo = repository(InMemoryDocumentStore::new());
        repo.insert(&Counter {
            id: "c".into(),
            value: 5,
        })
        .await
        .unwrap();

        let result: Result<(Counter, ()), _> = repo
            .update("c", |c| {
                c.value = 99;
                Err(DomainError::Validation("rejected".into()))
            })
            .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(repo.get("c").await.unwrap().value, 5);
    }

    #[tokio::test]
    async fn slow_store_surfaces_timeout() {
        let store = InMemoryDocumentStore::new();
        store.set_latency(Some(Duration::from_secs(1))).await;
        let repo: Repository<_, Counter> = Repository::new(store, Duration::from_millis(20));

        let result = repo.find("c").await;
        assert!(matches!(
            result,
            Err(DomainError::Timeout { operation: "get", .. })
        ));
    }

    #[tokio::test]
    async fn storage_failures_propagate_as_storage_errors() {
        let store = InMemoryDocumentStore::new();
        store.fail_puts_to("counters").await;
        let repo = repository(store);

        let result = repo
            .insert(&Counter {
                id: "c".into(),
                value: 1,
            })
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Storage(StoreError::Unavailable(_)))
        ));
    }
}
