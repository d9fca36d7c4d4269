//! Mesh platform events

use std::fmt::{self, Display};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::identity::NodeAddress;

/// Notifications raised by the platform mesh stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshEvent {
    /// Mesh networking started
    Started,

    /// Mesh networking stopped
    Stopped,

    /// Joined a parent at the given depth
    ParentConnected { layer: i32, parent: NodeAddress },

    /// Lost the parent link
    ParentDisconnected { reason: u16 },

    /// Depth in the tree changed
    LayerChanged { layer: i32 },

    /// Entries were added to the routing table
    RoutingTableAdded { change: usize, new_size: usize },

    /// Entries were removed from the routing table
    RoutingTableRemoved { change: usize, new_size: usize },

    /// The root node's address became known
    RootAddress(NodeAddress),

    /// The node was assigned a network address
    AddressAssigned(Ipv4Addr),
}

impl MeshEvent {
    /// Whether the event changes the node's routing table
    pub fn is_routing_change(&self) -> bool {
        matches!(
            self,
            Self::RoutingTableAdded { .. } | Self::RoutingTableRemoved { .. }
        )
    }
}

impl Display for MeshEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "MESH_STARTED"),
            Self::Stopped => write!(f, "MESH_STOPPED"),
            Self::ParentConnected { layer, parent } => {
                write!(f, "PARENT_CONNECTED layer:{} parent:{}", layer, parent)
            }
            Self::ParentDisconnected { reason } => {
                write!(f, "PARENT_DISCONNECTED reason:{}", reason)
            }
            Self::LayerChanged { layer } => write!(f, "LAYER_CHANGE layer:{}", layer),
            Self::RoutingTableAdded { change, new_size } => {
                write!(f, "ROUTING_TABLE_ADD add:{} new:{}", change, new_size)
            }
            Self::RoutingTableRemoved { change, new_size } => {
                write!(f, "ROUTING_TABLE_REMOVE remove:{} new:{}", change, new_size)
            }
            Self::RootAddress(addr) => write!(f, "ROOT_ADDRESS {}", addr),
            Self::AddressAssigned(ip) => write!(f, "GOT_IP {}", ip),
        }
    }
}
