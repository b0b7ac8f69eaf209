//! LS link records and their segment-routing TLVs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::MultiTopologyId;
use super::protocol::ProtocolId;

/// SR-MPLS Adjacency SID TLV (RFC 8667 / RFC 8665).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencySid {
    /// Protocol-specific flag set, carried as decoded upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Value>,
    /// Load-balancing weight.
    #[serde(default)]
    pub weight: u8,
    /// Label or index.
    pub sid: u32,
}

/// SRv6 End.X SID TLV (RFC 9514).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndXSid {
    /// SRv6 endpoint behavior codepoint.
    pub endpoint_behavior: u16,
    /// TLV flags.
    #[serde(default)]
    pub flag: u8,
    /// Flex-algo.
    #[serde(default)]
    pub algorithm: u8,
    /// Load-balancing weight.
    #[serde(default)]
    pub weight: u8,
    /// IPv6 SID.
    pub sid: String,
}

/// A unidirectional link-state link from a local node to a remote node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsLink {
    /// Storage key; also the key of the derived edge document.
    #[serde(rename = "_key", default)]
    pub key: String,
    /// Document identifier.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Source IGP.
    pub protocol_id: ProtocolId,
    /// BGP-LS identifier / instance.
    #[serde(default)]
    pub domain_id: i64,
    /// Topology of the link.
    #[serde(rename = "mt_id_tlv", default, skip_serializing_if = "Option::is_none")]
    pub mt_id: Option<MultiTopologyId>,
    /// OSPF area; empty for IS-IS.
    #[serde(default)]
    pub area_id: String,
    /// IGP router ID of the local endpoint.
    pub igp_router_id: String,
    /// IGP router ID of the remote endpoint.
    pub remote_igp_router_id: String,
    /// Local interface index.
    #[serde(default)]
    pub local_link_id: u32,
    /// Remote interface index.
    #[serde(default)]
    pub remote_link_id: u32,
    /// Local interface address.
    #[serde(default)]
    pub local_link_ip: String,
    /// Remote interface address.
    #[serde(default)]
    pub remote_link_ip: String,
    /// ASN of the local node.
    #[serde(default)]
    pub local_node_asn: u32,
    /// ASN of the remote node.
    #[serde(default)]
    pub remote_node_asn: u32,
    /// SR-MPLS adjacency SIDs.
    #[serde(rename = "ls_adjacency_sid", default, skip_serializing_if = "Option::is_none")]
    pub adjacency_sids: Option<Vec<AdjacencySid>>,
    /// SRv6 End.X SIDs.
    #[serde(rename = "srv6_endx_sid", default, skip_serializing_if = "Option::is_none")]
    pub srv6_endx_sids: Option<Vec<EndXSid>>,
    /// Attributes carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LsLink {
    /// Create a link between two IGP router IDs.
    pub fn new(
        key: impl Into<String>,
        protocol_id: ProtocolId,
        domain_id: i64,
        local_igp_router_id: impl Into<String>,
        remote_igp_router_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            id: String::new(),
            protocol_id,
            domain_id,
            mt_id: None,
            area_id: String::new(),
            igp_router_id: local_igp_router_id.into(),
            remote_igp_router_id: remote_igp_router_id.into(),
            local_link_id: 0,
            remote_link_id: 0,
            local_link_ip: String::new(),
            remote_link_ip: String::new(),
            local_node_asn: 0,
            remote_node_asn: 0,
            adjacency_sids: None,
            srv6_endx_sids: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the OSPF area.
    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = area_id.into();
        self
    }

    /// Set the local and remote interface addresses.
    pub fn with_link_ips(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        self.local_link_ip = local.into();
        self.remote_link_ip = remote.into();
        self
    }

    /// MT-ID of the link, 0 when absent.
    pub fn mt_id(&self) -> u16 {
        self.mt_id.map(|mt| mt.mt_id).unwrap_or(0)
    }
}
