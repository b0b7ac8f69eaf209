//! Change events delivered by the event transport.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change applied to a primary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Record created.
    Add,
    /// Record modified.
    Update,
    /// Record deleted.
    Del,
    /// Any action this crate does not act on.
    #[serde(other)]
    Other,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Del => write!(f, "del"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A change notification for one record of a primary collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Key of the changed record.
    #[serde(rename = "_key")]
    pub key: String,
    /// Document ID of the changed record, `<collection>/<key>`.
    #[serde(rename = "_id")]
    pub id: String,
    /// What happened to the record.
    pub action: Action,
}

impl EventMessage {
    /// Create an event for `collection/key`.
    pub fn new(collection: &str, key: impl Into<String>, action: Action) -> Self {
        let key = key.into();
        Self {
            id: format!("{}/{}", collection, key),
            key,
            action,
        }
    }

    /// Source collection encoded in the document ID.
    pub fn collection(&self) -> &str {
        self.id.split('/').next().unwrap_or_default()
    }
}
