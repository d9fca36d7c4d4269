//! Node context injection
//!
//! Several simulated nodes share one process, so every log line needs to say
//! which node emitted it. A [`NodeContextGuard`] sets the node identity for
//! the current thread; spans opened while it is alive carry it.

use std::cell::RefCell;

use chargemesh_core::NodeAddress;
use uuid::Uuid;

/// Node identity attached to spans
#[derive(Debug, Clone)]
pub struct NodeContextData {
    /// Last two address bytes, e.g. `"0a07"`
    pub node_id: String,
    /// Full hardware address
    pub address: NodeAddress,
    /// Unique id for this run of the node
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context.
///
/// Dropping the guard restores whatever context was active before it.
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Set `address` as the current node with a fresh instance id
    pub fn new(address: &NodeAddress) -> Self {
        Self::with_instance_id(address, Uuid::new_v4())
    }

    /// Set `address` as the current node with a known instance id
    pub fn with_instance_id(address: &NodeAddress, instance_id: Uuid) -> Self {
        let data = NodeContextData {
            node_id: address.short_id(),
            address: *address,
            instance_id,
        };
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(data));
        Self { previous }
    }

    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    pub fn current_node_id() -> Option<String> {
        Self::current().map(|ctx| ctx.node_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
