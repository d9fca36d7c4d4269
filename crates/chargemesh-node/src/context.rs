//! Per-node context
//!
//! Everything a node's tasks share: its identity, configuration, the route
//! table cache and the arbitration engine. Built once and handed to every
//! task behind an `Arc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chargemesh_arbitration::{ArbitrationEngine, Publisher};
use chargemesh_core::{MeshLayer, MeshTransport, NodeAddress};
use chargemesh_routing::RouteTableCache;

use crate::config::NodeConfig;

/// Shared state of one mesh node
pub struct NodeContext {
    address: NodeAddress,
    config: NodeConfig,
    cache: Arc<RouteTableCache>,
    engine: Arc<ArbitrationEngine>,
    transport: Arc<dyn MeshTransport>,
    mesh: Arc<dyn MeshLayer>,
    keypresses: AtomicU64,
}

impl NodeContext {
    pub fn new(
        address: NodeAddress,
        config: NodeConfig,
        transport: Arc<dyn MeshTransport>,
        mesh: Arc<dyn MeshLayer>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let cache = Arc::new(RouteTableCache::with_lock_timeout(
            config.route_table_capacity,
            config.lock_timeout(),
        ));
        let engine = Arc::new(ArbitrationEngine::new(
            publisher,
            Arc::clone(&mesh),
            config.match_rule,
        ));

        Self {
            address,
            config,
            cache,
            engine,
            transport,
            mesh,
            keypresses: AtomicU64::new(0),
        }
    }

    /// Our hardware address
    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RouteTableCache> {
        &self.cache
    }

    pub fn engine(&self) -> &Arc<ArbitrationEngine> {
        &self.engine
    }

    pub fn transport(&self) -> &Arc<dyn MeshTransport> {
        &self.transport
    }

    pub fn mesh(&self) -> &Arc<dyn MeshLayer> {
        &self.mesh
    }

    /// KEYPRESS frames received from other nodes
    pub fn keypresses_received(&self) -> u64 {
        self.keypresses.load(Ordering::Relaxed)
    }

    pub(crate) fn record_keypress(&self) {
        self.keypresses.fetch_add(1, Ordering::Relaxed);
    }
}
