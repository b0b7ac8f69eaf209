//! BGP-LS protocol identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol-ID carried in BGP-LS NLRI (RFC 7752, section 3.2).
///
/// Serialized as its numeric code so documents stay compatible with the
/// collections populated by the upstream ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ProtocolId {
    /// IS-IS Level 1.
    IsisL1,
    /// IS-IS Level 2.
    IsisL2,
    /// OSPFv2.
    Ospfv2,
    /// Directly connected.
    Direct,
    /// Static configuration.
    Static,
    /// OSPFv3.
    Ospfv3,
    /// BGP (EPE / BGP-only fabrics).
    Bgp,
    /// Any code this crate does not know about.
    Unknown(u8),
}

impl ProtocolId {
    /// Numeric protocol code.
    pub fn code(&self) -> u8 {
        u8::from(*self)
    }

    /// Whether node identity is scoped by OSPF area.
    pub fn is_area_scoped(&self) -> bool {
        matches!(self, Self::Ospfv2 | Self::Ospfv3)
    }
}

impl From<u8> for ProtocolId {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::IsisL1,
            2 => Self::IsisL2,
            3 => Self::Ospfv2,
            4 => Self::Direct,
            5 => Self::Static,
            6 => Self::Ospfv3,
            7 => Self::Bgp,
            other => Self::Unknown(other),
        }
    }
}

impl From<ProtocolId> for u8 {
    fn from(protocol: ProtocolId) -> Self {
        match protocol {
            ProtocolId::IsisL1 => 1,
            ProtocolId::IsisL2 => 2,
            ProtocolId::Ospfv2 => 3,
            ProtocolId::Direct => 4,
            ProtocolId::Static => 5,
            ProtocolId::Ospfv3 => 6,
            ProtocolId::Bgp => 7,
            ProtocolId::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsisL1 => write!(f, "isis-l1"),
            Self::IsisL2 => write!(f, "isis-l2"),
            Self::Ospfv2 => write!(f, "ospfv2"),
            Self::Direct => write!(f, "direct"),
            Self::Static => write!(f, "static"),
            Self::Ospfv3 => write!(f, "ospfv3"),
            Self::Bgp => write!(f, "bgp"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in 0..=u8::MAX {
            assert_eq!(ProtocolId::from(code).code(), code);
        }
    }

    #[test]
    fn test_area_scoped() {
        assert!(ProtocolId::Ospfv2.is_area_scoped());
        assert!(ProtocolId::Ospfv3.is_area_scoped());
        assert!(!ProtocolId::IsisL2.is_area_scoped());
        assert!(!ProtocolId::Bgp.is_area_scoped());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(ProtocolId::IsisL2).unwrap();
        assert_eq!(json, serde_json::json!(2));

        let parsed: ProtocolId = serde_json::from_value(serde_json::json!(6)).unwrap();
        assert_eq!(parsed, ProtocolId::Ospfv3);
    }
}
