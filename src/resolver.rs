//! Endpoint resolution: link endpoint → node document.
//!
//! A link names its endpoints only by IGP router ID. The node it refers to
//! is the single node record in the same topology scope: same protocol and
//! domain, and for OSPF the same area. Anything other than exactly one
//! match is an error; the resolver never picks among duplicates.

use std::sync::Arc;

use crate::error::{decode, Endpoint, ResolutionFailure, SyncError};
use crate::store::{DocumentStore, Filter, Query};
use crate::types::{LsLink, LsNode, ProtocolId};

/// Outcome of an endpoint lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Exactly one node in scope.
    Found(LsNode),
    /// No node in scope.
    NotFound,
    /// Several nodes in scope; carries the match count.
    Ambiguous(usize),
}

/// Filters selecting records of one topology scope.
///
/// `area_id` only participates for area-scoped protocols (OSPFv2/v3).
pub fn scope_filters(protocol_id: ProtocolId, domain_id: i64, area_id: &str) -> Vec<Filter> {
    let mut filters = vec![
        Filter::eq("domain_id", domain_id),
        Filter::eq("protocol_id", protocol_id.code()),
    ];
    if protocol_id.is_area_scoped() {
        filters.push(Filter::eq("area_id", area_id));
    }
    filters
}

/// Resolves link endpoints against the node collection.
pub struct EndpointResolver<S: DocumentStore> {
    store: Arc<S>,
    node_collection: String,
}

impl<S: DocumentStore> EndpointResolver<S> {
    /// Create a resolver over `node_collection`.
    pub fn new(store: Arc<S>, node_collection: impl Into<String>) -> Self {
        Self {
            store,
            node_collection: node_collection.into(),
        }
    }

    /// Query selecting the node(s) an endpoint of `link` refers to.
    pub fn scope_query(&self, link: &LsLink, endpoint: Endpoint) -> Query {
        let router_id = match endpoint {
            Endpoint::Local => &link.igp_router_id,
            Endpoint::Remote => &link.remote_igp_router_id,
        };
        scope_filters(link.protocol_id, link.domain_id, &link.area_id)
            .into_iter()
            .fold(
                Query::new(&self.node_collection).filter_eq("igp_router_id", router_id.as_str()),
                Query::filter,
            )
    }

    /// Look up an endpoint without turning a miss into an error.
    pub async fn lookup(&self, link: &LsLink, endpoint: Endpoint) -> Result<Resolution, SyncError> {
        let mut matches = self
            .store
            .query(&self.scope_query(link, endpoint))
            .await
            .map_err(SyncError::from_store)?;

        match matches.len() {
            0 => Ok(Resolution::NotFound),
            1 => {
                let node = decode(&self.node_collection, matches.remove(0))?;
                Ok(Resolution::Found(node))
            }
            n => Ok(Resolution::Ambiguous(n)),
        }
    }

    /// Resolve an endpoint to its node record.
    pub async fn resolve(&self, link: &LsLink, endpoint: Endpoint) -> Result<LsNode, SyncError> {
        let failure = match self.lookup(link, endpoint).await? {
            Resolution::Found(node) => {
                tracing::trace!(
                    link_key = %link.key,
                    %endpoint,
                    node_id = %node.id,
                    protocol = %node.protocol_id,
                    domain_id = node.domain_id,
                    "Endpoint resolved"
                );
                return Ok(node);
            }
            Resolution::NotFound => ResolutionFailure::NotFound,
            Resolution::Ambiguous(n) => ResolutionFailure::Ambiguous(n),
        };

        Err(SyncError::Resolution {
            link_key: link.key.clone(),
            endpoint,
            igp_router_id: match endpoint {
                Endpoint::Local => link.igp_router_id.clone(),
                Endpoint::Remote => link.remote_igp_router_id.clone(),
            },
            failure,
        })
    }
}

impl<S: DocumentStore> Clone for EndpointResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            node_collection: self.node_collection.clone(),
        }
    }
}
