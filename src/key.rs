//! Deterministic document keys for link-state records.
//!
//! Keys join the identity fields of a record with `_`. Field order is fixed
//! and the numeric scope fields always lead, so two records from different
//! protocol, domain or topology scopes never share a key prefix even though
//! area IDs and prefixes are free-form strings.

use crate::types::{LsLink, LsNode, LsPrefix};

/// Separator between key fields.
pub const KEY_SEPARATOR: char = '_';

/// Key of a topology node: protocol, domain, MT-ID, area, IGP router ID.
pub fn node_key(node: &LsNode) -> String {
    join(&[
        node.protocol_id.code().to_string(),
        node.domain_id.to_string(),
        node.mt_id().to_string(),
        node.area_id.clone(),
        node.igp_router_id.clone(),
    ])
}

/// Key of a prefix: protocol, domain, MT-ID, area, route type, prefix,
/// prefix length, IGP router ID.
pub fn prefix_key(prefix: &LsPrefix) -> String {
    let mt_id = prefix.mt_id.map(|mt| mt.mt_id).unwrap_or(0);
    join(&[
        prefix.protocol_id.code().to_string(),
        prefix.domain_id.to_string(),
        mt_id.to_string(),
        prefix.area_id.clone(),
        prefix.ospf_route_type.to_string(),
        prefix.prefix.clone(),
        prefix.prefix_len.to_string(),
        prefix.igp_router_id.clone(),
    ])
}

/// Key of a link, which is also the key of its edge document.
pub fn link_key(link: &LsLink) -> &str {
    &link.key
}

fn join(fields: &[String]) -> String {
    let mut key = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(field);
    }
    key
}
