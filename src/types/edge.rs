//! Edge documents of the LS node graph.

use serde::{Deserialize, Serialize};

use super::link::{AdjacencySid, EndXSid, LsLink};
use super::node::LsNode;
use super::protocol::ProtocolId;

/// Graph relationship materializing an [`LsLink`] between two resolved
/// [`LsNode`] documents.
///
/// The edge key mirrors the link key, so every edge has exactly one source
/// link. Link attributes are denormalized for query convenience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsNodeEdge {
    /// Edge key, equal to the source link key.
    #[serde(rename = "_key")]
    pub key: String,
    /// Document ID of the local node.
    #[serde(rename = "_from")]
    pub from: String,
    /// Document ID of the remote node.
    #[serde(rename = "_to")]
    pub to: String,
    /// Key of the source link.
    pub link: String,
    /// Source IGP.
    pub protocol_id: ProtocolId,
    /// BGP-LS identifier.
    pub domain_id: i64,
    /// Topology of the link.
    pub mt_id: u16,
    /// OSPF area.
    pub area_id: String,
    /// Local interface ID.
    pub local_link_id: u32,
    /// Remote interface ID.
    pub remote_link_id: u32,
    /// Local interface address.
    pub local_link_ip: String,
    /// Remote interface address.
    pub remote_link_ip: String,
    /// Local node ASN.
    pub local_node_asn: u32,
    /// Remote node ASN.
    pub remote_node_asn: u32,
    /// SRv6 End.X SIDs of the adjacency.
    #[serde(rename = "srv6_endx_sid", default, skip_serializing_if = "Option::is_none")]
    pub srv6_endx_sids: Option<Vec<EndXSid>>,
    /// SR-MPLS adjacency SIDs.
    #[serde(rename = "ls_adj_sid", default, skip_serializing_if = "Option::is_none")]
    pub adjacency_sids: Option<Vec<AdjacencySid>>,
}

impl LsNodeEdge {
    /// Build the edge for `link` between its resolved endpoints.
    pub fn from_link(key: impl Into<String>, link: &LsLink, local: &LsNode, remote: &LsNode) -> Self {
        Self {
            key: key.into(),
            from: local.id.clone(),
            to: remote.id.clone(),
            link: link.key.clone(),
            protocol_id: link.protocol_id,
            domain_id: link.domain_id,
            mt_id: link.mt_id(),
            area_id: link.area_id.clone(),
            local_link_id: link.local_link_id,
            remote_link_id: link.remote_link_id,
            local_link_ip: link.local_link_ip.clone(),
            remote_link_ip: link.remote_link_ip.clone(),
            local_node_asn: link.local_node_asn,
            remote_node_asn: link.remote_node_asn,
            srv6_endx_sids: link.srv6_endx_sids.clone(),
            adjacency_sids: link.adjacency_sids.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: &str, router: &str) -> LsNode {
        let mut node = LsNode::new(ProtocolId::IsisL2, 1, "", router).with_key(key);
        node.id = format!("ls_node/{}", key);
        node
    }

    #[test]
    fn test_from_link_copies_attributes() {
        let a = node("a", "0000.0000.0001");
        let b = node("b", "0000.0000.0002");
        let link = LsLink::new("L1", ProtocolId::IsisL2, 1, "0000.0000.0001", "0000.0000.0002")
            .with_link_ips("10.0.0.0", "10.0.0.1");

        let edge = LsNodeEdge::from_link("L1", &link, &a, &b);
        assert_eq!(edge.key, "L1");
        assert_eq!(edge.link, "L1");
        assert_eq!(edge.from, "ls_node/a");
        assert_eq!(edge.to, "ls_node/b");
        assert_eq!(edge.local_link_ip, "10.0.0.0");
    }

    #[test]
    fn test_serialized_field_names() {
        let a = node("a", "0000.0000.0001");
        let b = node("b", "0000.0000.0002");
        let link = LsLink::new("L1", ProtocolId::IsisL2, 1, "0000.0000.0001", "0000.0000.0002");

        let json = serde_json::to_value(LsNodeEdge::from_link("L1", &link, &a, &b)).unwrap();
        assert_eq!(json["_key"], "L1");
        assert_eq!(json["_from"], "ls_node/a");
        assert_eq!(json["_to"], "ls_node/b");
        assert_eq!(json["protocol_id"], 2);
        assert!(json.get("ls_adj_sid").is_none());
    }
}
