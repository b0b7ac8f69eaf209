//! LS node and LS prefix records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::protocol::ProtocolId;

/// Multi-Topology Identifier TLV (RFC 7752, section 3.2.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MultiTopologyId {
    /// Overload bit (OSPF only).
    #[serde(default)]
    pub o_flag: bool,
    /// Attach bit (IS-IS only).
    #[serde(default)]
    pub a_flag: bool,
    /// 12-bit MT-ID.
    #[serde(default)]
    pub mt_id: u16,
}

/// A link-state node, the vertex of the topology graph.
///
/// Owned by the upstream ingestion pipeline; this crate only reads it.
/// Attributes not modelled here are kept in `extra` so nothing is lost when
/// a record is decoded and re-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsNode {
    /// Storage key.
    #[serde(rename = "_key", default)]
    pub key: String,
    /// Document identifier (`<collection>/<key>`), the graph vertex reference.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Source IGP.
    pub protocol_id: ProtocolId,
    /// BGP-LS identifier / instance.
    #[serde(default)]
    pub domain_id: i64,
    /// OSPF area; empty for IS-IS.
    #[serde(default)]
    pub area_id: String,
    /// IGP router identity (system ID or router ID).
    pub igp_router_id: String,
    /// Topologies this node participates in.
    #[serde(rename = "mt_id_tlv", default, skip_serializing_if = "Option::is_none")]
    pub mt_ids: Option<Vec<MultiTopologyId>>,
    /// Advertised hostname.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Autonomous system of the node.
    #[serde(default)]
    pub asn: u32,
    /// Attributes carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LsNode {
    /// Create a node in the given identity scope.
    pub fn new(
        protocol_id: ProtocolId,
        domain_id: i64,
        area_id: impl Into<String>,
        igp_router_id: impl Into<String>,
    ) -> Self {
        Self {
            key: String::new(),
            id: String::new(),
            protocol_id,
            domain_id,
            area_id: area_id.into(),
            igp_router_id: igp_router_id.into(),
            mt_ids: None,
            name: String::new(),
            asn: 0,
            extra: BTreeMap::new(),
        }
    }

    /// Set the storage key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// First advertised MT-ID, or 0 for the default topology.
    pub fn mt_id(&self) -> u16 {
        self.mt_ids
            .as_ref()
            .and_then(|ids| ids.first())
            .map(|mt| mt.mt_id)
            .unwrap_or(0)
    }
}

/// A link-state prefix record.
///
/// Only its key derivation is used by the graph engine; prefixes are not
/// vertices of the node graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsPrefix {
    /// Storage key.
    #[serde(rename = "_key", default)]
    pub key: String,
    /// Source IGP.
    pub protocol_id: ProtocolId,
    /// BGP-LS identifier / instance.
    #[serde(default)]
    pub domain_id: i64,
    /// Topology of the prefix.
    #[serde(rename = "mt_id_tlv", default, skip_serializing_if = "Option::is_none")]
    pub mt_id: Option<MultiTopologyId>,
    /// OSPF area; empty for IS-IS.
    #[serde(default)]
    pub area_id: String,
    /// OSPF route type (intra-area, inter-area, external...); 0 for IS-IS.
    #[serde(default)]
    pub ospf_route_type: u8,
    /// Network address.
    pub prefix: String,
    /// Mask length.
    pub prefix_len: u8,
    /// Advertising router.
    pub igp_router_id: String,
}
