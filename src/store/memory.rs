//! In-memory document store for testing.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use super::{
    document_key, stamp_identity, CreateOutcome, DocumentStore, Query, RemoveOutcome, UpdateOutcome,
};

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Document has no `_key`.
    #[error("Document has no _key")]
    MissingKey,
    /// Document is not a JSON object.
    #[error("Document is not a JSON object")]
    NotAnObject,
    /// Collection was marked unavailable with [`InMemoryDocumentStore::fail_collection`].
    #[error("Collection unavailable: {0}")]
    Unavailable(String),
    /// Seeding a typed record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

type Collection = BTreeMap<String, Value>;

/// In-memory document store for testing.
///
/// Uses BTreeMap for deterministic iteration order. Interior mutability
/// lets it be shared through `Arc` like a real backend.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<BTreeMap<String, Collection>>,
    unavailable: RwLock<BTreeSet<String>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record, bypassing conflict detection.
    ///
    /// This is how tests play the role of the upstream ingestion pipeline.
    pub fn put<T: Serialize>(&self, collection: &str, key: &str, record: &T) -> Result<Value, InMemoryError> {
        let value = serde_json::to_value(record).map_err(|e| InMemoryError::Serialization(e.to_string()))?;
        let document = stamp_identity(collection, key, value).ok_or(InMemoryError::NotAnObject)?;
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document.clone());
        Ok(document)
    }

    /// Delete a record, bypassing notifications. Returns whether it existed.
    pub fn delete(&self, collection: &str, key: &str) -> bool {
        self.collections
            .write()
            .get_mut(collection)
            .map(|c| c.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Get a document.
    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.collections.read().get(collection).and_then(|c| c.get(key).cloned())
    }

    /// All documents of a collection, ordered by key.
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map(|c| c.len()).unwrap_or(0)
    }

    /// Make every operation on `collection` fail until [`Self::restore_collection`].
    pub fn fail_collection(&self, collection: &str) {
        self.unavailable.write().insert(collection.to_string());
    }

    /// Undo [`Self::fail_collection`].
    pub fn restore_collection(&self, collection: &str) {
        self.unavailable.write().remove(collection);
    }

    fn check_available(&self, collection: &str) -> Result<(), InMemoryError> {
        if self.unavailable.read().contains(collection) {
            return Err(InMemoryError::Unavailable(collection.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    type Error = InMemoryError;

    async fn read_document(&self, collection: &str, key: &str) -> Result<Option<Value>, Self::Error> {
        self.check_available(collection)?;
        Ok(self.get(collection, key))
    }

    async fn create_document(&self, collection: &str, document: Value) -> Result<CreateOutcome, Self::Error> {
        self.check_available(collection)?;
        let key = document_key(&document).ok_or(InMemoryError::MissingKey)?.to_string();
        let document = stamp_identity(collection, &key, document).ok_or(InMemoryError::NotAnObject)?;

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&key) {
            return Ok(CreateOutcome::Conflict);
        }
        docs.insert(key, document);
        Ok(CreateOutcome::Created)
    }

    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<UpdateOutcome, Self::Error> {
        self.check_available(collection)?;
        let document = stamp_identity(collection, key, document).ok_or(InMemoryError::NotAnObject)?;

        let mut collections = self.collections.write();
        match collections.get_mut(collection).and_then(|c| c.get_mut(key)) {
            Some(existing) => {
                *existing = document;
                Ok(UpdateOutcome::Updated)
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    async fn remove_document(&self, collection: &str, key: &str) -> Result<RemoveOutcome, Self::Error> {
        self.check_available(collection)?;
        let removed = self
            .collections
            .write()
            .get_mut(collection)
            .and_then(|c| c.remove(key));
        Ok(match removed {
            Some(document) => RemoveOutcome::Removed(document),
            None => RemoveOutcome::NotFound,
        })
    }

    async fn query(&self, query: &Query) -> Result<Vec<Value>, Self::Error> {
        self.check_available(query.collection())?;
        Ok(self
            .collections
            .read()
            .get(query.collection())
            .map(|c| c.values().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }
}
