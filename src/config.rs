//! Synchronizer configuration.
//!
//! ## Environment
//!
//! - `LS_NODE_COLLECTION`: vertex collection (default: `ls_node`)
//! - `LS_LINK_COLLECTION`: link collection (default: `ls_link`)
//! - `LS_NODE_EDGE_COLLECTION`: edge collection (default: `ls_node_edge`)
//! - `UNTRACKED_PROTOCOLS`: comma-separated protocol codes kept out of the
//!   graph (default: `7`, BGP)

use std::collections::BTreeSet;

use crate::types::ProtocolId;

/// Collection bindings and protocol scope of a synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Collection holding LS node records.
    pub node_collection: String,
    /// Collection holding LS link records.
    pub link_collection: String,
    /// Collection holding derived edge documents.
    pub edge_collection: String,
    /// Protocols whose topology is not graphed.
    pub untracked_protocols: BTreeSet<ProtocolId>,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node_collection: std::env::var("LS_NODE_COLLECTION").unwrap_or(defaults.node_collection),
            link_collection: std::env::var("LS_LINK_COLLECTION").unwrap_or(defaults.link_collection),
            edge_collection: std::env::var("LS_NODE_EDGE_COLLECTION").unwrap_or(defaults.edge_collection),
            untracked_protocols: std::env::var("UNTRACKED_PROTOCOLS")
                .map(|s| parse_protocol_list(&s))
                .unwrap_or(defaults.untracked_protocols),
        }
    }

    /// Whether links and nodes of `protocol` belong in the graph.
    pub fn is_tracked(&self, protocol: ProtocolId) -> bool {
        !self.untracked_protocols.contains(&protocol)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node_collection: "ls_node".to_string(),
            link_collection: "ls_link".to_string(),
            edge_collection: "ls_node_edge".to_string(),
            untracked_protocols: BTreeSet::from([ProtocolId::Bgp]),
        }
    }
}

/// Parse a comma-separated list of protocol codes. Invalid entries are
/// skipped with a warning.
pub fn parse_protocol_list(list: &str) -> BTreeSet<ProtocolId> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<u8>() {
            Ok(code) => Some(ProtocolId::from(code)),
            Err(_) => {
                tracing::warn!(entry = s, "Ignoring invalid protocol code");
                None
            }
        })
        .collect()
}
