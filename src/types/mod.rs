//! Record, document and event types.

pub mod protocol;
pub mod node;
pub mod link;
pub mod edge;
pub mod event;

pub use protocol::ProtocolId;
pub use node::{LsNode, LsPrefix, MultiTopologyId};
pub use link::{LsLink, AdjacencySid, EndXSid};
pub use edge::LsNodeEdge;
pub use event::{EventMessage, Action};
