//! Document storage backends.
//!
//! The graph engine only needs keyed CRUD plus filtered queries over JSON
//! documents laid out the ArangoDB way: `_key` inside a collection, `_id`
//! as `<collection>/<key>`, and `_from`/`_to` on edge documents.

pub mod memory;
pub mod query;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

pub use query::{Filter, Query};

/// Result of a create attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The document was stored.
    Created,
    /// A document with the same key already exists; nothing was written.
    Conflict,
}

/// Result of an update (full replace) attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The document was replaced.
    Updated,
    /// No document with that key exists.
    NotFound,
}

/// Result of a remove attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    /// The document was removed; carries its last stored body.
    Removed(Value),
    /// No document with that key exists.
    NotFound,
}

/// Trait for document storage backends.
///
/// "Not found" and "conflict" are ordinary outcomes, not errors. `Error` is
/// reserved for backend failures, which callers treat as fatal for the
/// operation at hand.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read a document by key.
    async fn read_document(&self, collection: &str, key: &str) -> Result<Option<Value>, Self::Error>;

    /// Create a document. The document must carry a `_key`; the store
    /// assigns `_id`.
    async fn create_document(&self, collection: &str, document: Value) -> Result<CreateOutcome, Self::Error>;

    /// Replace an existing document.
    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<UpdateOutcome, Self::Error>;

    /// Remove a document by key.
    async fn remove_document(&self, collection: &str, key: &str) -> Result<RemoveOutcome, Self::Error>;

    /// Run a filtered query. Results are ordered by key; the returned
    /// vector is the fully drained cursor.
    async fn query(&self, query: &Query) -> Result<Vec<Value>, Self::Error>;

    /// Check if the backend is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Document ID for `key` in `collection`.
pub fn document_id(collection: &str, key: &str) -> String {
    format!("{}/{}", collection, key)
}

/// The `_key` of a document, if it has a non-empty one.
pub fn document_key(document: &Value) -> Option<&str> {
    document
        .get("_key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
}

/// Stamp `_key` and `_id` onto a document before it is written.
///
/// Returns `None` when the document is not a JSON object.
pub(crate) fn stamp_identity(collection: &str, key: &str, mut document: Value) -> Option<Value> {
    let object = document.as_object_mut()?;
    object.insert("_key".to_string(), Value::String(key.to_string()));
    object.insert("_id".to_string(), Value::String(document_id(collection, key)));
    Some(document)
}

pub use memory::InMemoryDocumentStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDocumentStore;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_key() {
        assert_eq!(document_key(&json!({"_key": "L1"})), Some("L1"));
        assert_eq!(document_key(&json!({"_key": ""})), None);
        assert_eq!(document_key(&json!({"name": "x"})), None);
    }

    #[test]
    fn test_stamp_identity() {
        let doc = stamp_identity("ls_node_edge", "L1", json!({"_from": "ls_node/a"})).unwrap();
        assert_eq!(doc["_key"], "L1");
        assert_eq!(doc["_id"], "ls_node_edge/L1");
        assert!(stamp_identity("c", "k", json!([1, 2])).is_none());
    }
}
