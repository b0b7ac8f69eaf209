//! Service state management.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dispatcher::GraphSynchronizer;
use crate::notify::EdgeNotifier;
use crate::store::DocumentStore;
use crate::SyncConfig;

/// Counters of handled events.
#[derive(Debug, Default)]
pub struct EventCounters {
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`EventCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventCountersSnapshot {
    /// Events handled successfully.
    pub processed: u64,
    /// Events that returned an error.
    pub failed: u64,
}

impl EventCounters {
    /// Record the result of one event.
    pub fn record(&self, success: bool) {
        let counter = if success { &self.processed } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the counters.
    pub fn snapshot(&self) -> EventCountersSnapshot {
        EventCountersSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Shared service state.
pub struct ServiceState<S: DocumentStore + 'static> {
    /// The synchronizer handling every event.
    pub graph: Arc<GraphSynchronizer<S>>,
    /// Event counters for the health endpoint.
    pub counters: Arc<EventCounters>,
    /// Service start time.
    pub started_at: DateTime<Utc>,
}

impl<S: DocumentStore + 'static> ServiceState<S> {
    /// Create service state around a store and notifier.
    pub fn new(store: S, notifier: Arc<dyn EdgeNotifier>, config: SyncConfig) -> Self {
        Self::from_graph(GraphSynchronizer::new(Arc::new(store), notifier, config))
    }

    /// Create service state around an existing synchronizer.
    pub fn from_graph(graph: GraphSynchronizer<S>) -> Self {
        Self {
            graph: Arc::new(graph),
            counters: Arc::new(EventCounters::default()),
            started_at: Utc::now(),
        }
    }
}

impl<S: DocumentStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            counters: Arc::clone(&self.counters),
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let counters = EventCounters::default();
        counters.record(true);
        counters.record(true);
        counters.record(false);

        assert_eq!(counters.snapshot(), EventCountersSnapshot { processed: 2, failed: 1 });
    }
}
