//! Platform mesh layer
//!
//! The platform maintains the mesh topology and its routing table. The
//! [`MeshLayer`] trait exposes the read-only view the firmware needs: the
//! current routing table, the node's depth and role, and the signal strength
//! of its uplink.

use std::fmt::{self, Display};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::identity::NodeAddress;
use crate::route_table::RouteTable;

/// Role of a node in the mesh tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshRole {
    /// The node bridging the mesh to the gateway
    Root,
    /// Any other node
    Node,
}

impl MeshRole {
    /// Build from the platform's root flag
    pub fn from_is_root(is_root: bool) -> Self {
        if is_root { Self::Root } else { Self::Node }
    }

    /// Wire form used in telemetry
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::Node => "NODE",
        }
    }
}

impl Display for MeshRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time telemetry from the mesh layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStatus {
    /// Uplink signal strength in dBm
    pub rssi: i32,
    /// Depth in the mesh tree (root is layer 1, -1 before joining)
    pub layer: i32,
    /// Entries in the platform routing table
    pub routing_table_size: usize,
    /// Root or ordinary node
    pub role: MeshRole,
}

/// Read-only view of the platform mesh stack
pub trait MeshLayer: Send + Sync {
    /// Current routing table, at most `capacity` entries
    fn routing_table(&self, capacity: usize) -> RouteTable;

    /// Number of entries in the platform routing table
    fn routing_table_size(&self) -> usize;

    /// Depth of this node in the mesh tree
    fn layer(&self) -> i32;

    /// Whether this node is the mesh root
    fn is_root(&self) -> bool;

    /// Signal strength of the uplink in dBm
    fn rssi(&self) -> i32;

    /// Gather all telemetry in one call
    fn status(&self) -> MeshStatus {
        MeshStatus {
            rssi: self.rssi(),
            layer: self.layer(),
            routing_table_size: self.routing_table_size(),
            role: MeshRole::from_is_root(self.is_root()),
        }
    }
}

#[derive(Debug, Clone)]
struct MockMeshState {
    routes: Vec<NodeAddress>,
    layer: i32,
    is_root: bool,
    rssi: i32,
}

/// Settable mesh layer for tests and the simulator
#[derive(Debug)]
pub struct MockMeshLayer {
    state: RwLock<MockMeshState>,
}

impl MockMeshLayer {
    /// A node that has not joined any mesh yet
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockMeshState {
                routes: Vec::new(),
                layer: -1,
                is_root: false,
                rssi: 0,
            }),
        }
    }

    /// A root node whose routing table lists `routes` (itself first)
    pub fn root(routes: Vec<NodeAddress>) -> Self {
        let layer = Self::new();
        layer.set_routes(routes);
        layer.set_layer(1);
        layer.set_root(true);
        layer
    }

    /// A non-root node at `layer`
    pub fn node(routes: Vec<NodeAddress>, layer: i32) -> Self {
        let mesh = Self::new();
        mesh.set_routes(routes);
        mesh.set_layer(layer);
        mesh
    }

    /// Replace the platform routing table
    pub fn set_routes(&self, routes: Vec<NodeAddress>) {
        self.state.write().routes = routes;
    }

    /// Set the mesh depth
    pub fn set_layer(&self, layer: i32) {
        self.state.write().layer = layer;
    }

    /// Set the root flag
    pub fn set_root(&self, is_root: bool) {
        self.state.write().is_root = is_root;
    }

    /// Set the uplink RSSI
    pub fn set_rssi(&self, rssi: i32) {
        self.state.write().rssi = rssi;
    }
}

impl Default for MockMeshLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshLayer for MockMeshLayer {
    fn routing_table(&self, capacity: usize) -> RouteTable {
        let routes = self.state.read().routes.clone();
        RouteTable::from_entries(routes, capacity).0
    }

    fn routing_table_size(&self) -> usize {
        self.state.read().routes.len()
    }

    fn layer(&self) -> i32 {
        self.state.read().layer
    }

    fn is_root(&self) -> bool {
        self.state.read().is_root
    }

    fn rssi(&self) -> i32 {
        self.state.read().rssi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> NodeAddress {
        NodeAddress::new([0, 0, 0, 0, 0, n])
    }

    #[test]
    fn test_role_wire_form() {
        assert_eq!(MeshRole::from_is_root(true).to_string(), "ROOT");
        assert_eq!(MeshRole::from_is_root(false).to_string(), "NODE");
    }

    #[test]
    fn test_mock_status() {
        let mesh = MockMeshLayer::root(vec![addr(1), addr(2), addr(3)]);
        mesh.set_rssi(-61);

        let status = mesh.status();
        assert_eq!(status.rssi, -61);
        assert_eq!(status.layer, 1);
        assert_eq!(status.routing_table_size, 3);
        assert_eq!(status.role, MeshRole::Root);
    }

    #[test]
    fn test_mock_routing_table_bounded() {
        let mesh = MockMeshLayer::node((1..=10).map(addr).collect(), 2);
        let table = mesh.routing_table(4);
        assert_eq!(table.len(), 4);
        assert_eq!(mesh.routing_table_size(), 10);
    }
}
