//! Outbound change notifications for removed edges.
//!
//! The synchronizer reports every edge it deletes so downstream consumers
//! can observe the graph shrinking. Delivery is fire-and-forget: a notifier
//! must not fail the graph mutation that triggered it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::Action;

/// A removed edge document and the action that caused the removal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeNotification {
    /// Edge collection.
    pub collection: String,
    /// Edge key.
    #[serde(rename = "_key")]
    pub key: String,
    /// Edge document ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// Triggering action.
    pub action: Action,
    /// Last stored body of the edge.
    pub document: Value,
    /// When the removal was observed.
    pub emitted_at: DateTime<Utc>,
}

impl EdgeNotification {
    /// Build a notification for a removed document.
    pub fn removed(collection: &str, key: &str, document: Value, action: Action) -> Self {
        Self {
            collection: collection.to_string(),
            key: key.to_string(),
            id: crate::store::document_id(collection, key),
            action,
            document,
            emitted_at: Utc::now(),
        }
    }
}

/// Sink for edge notifications.
pub trait EdgeNotifier: Send + Sync {
    /// Publish a notification.
    fn notify(&self, notification: EdgeNotification);
}

/// Notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotifier;

impl EdgeNotifier for NoOpNotifier {
    fn notify(&self, _notification: EdgeNotification) {
        // No-op
    }
}

/// Notifier that writes each notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl EdgeNotifier for LogNotifier {
    fn notify(&self, notification: EdgeNotification) {
        tracing::info!(
            target: "lsnode_graph::notify",
            collection = %notification.collection,
            key = %notification.key,
            action = %notification.action,
            "edge_removed"
        );
    }
}

/// Notifier that forwards notifications to an in-process consumer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<EdgeNotification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EdgeNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EdgeNotifier for ChannelNotifier {
    fn notify(&self, notification: EdgeNotification) {
        if let Err(e) = self.sender.send(notification) {
            tracing::warn!(key = %e.0.key, "Notification receiver dropped");
        }
    }
}

/// In-memory notifier for testing.
#[derive(Debug, Default)]
pub struct TestNotifier {
    /// Notifications in emission order.
    pub notifications: parking_lot::Mutex<Vec<EdgeNotification>>,
}

impl EdgeNotifier for TestNotifier {
    fn notify(&self, notification: EdgeNotification) {
        self.notifications.lock().push(notification);
    }
}

impl TestNotifier {
    /// Keys of notified edges, in emission order.
    pub fn keys(&self) -> Vec<String> {
        self.notifications.lock().iter().map(|n| n.key.clone()).collect()
    }

    /// Number of notifications received.
    pub fn len(&self) -> usize {
        self.notifications.lock().len()
    }

    /// Whether no notification was received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
