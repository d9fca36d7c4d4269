//! Transport abstraction for mesh frames
//!
//! The [`MeshTransport`] trait is the point-to-point delivery service the
//! platform's mesh stack provides. Routing, retries and topology are the
//! platform's business; callers only hand a frame to an address.
//!
//! ## Implementations
//!
//! - [`MockTransport`](crate::MockTransport): in-memory transport for tests
//!   and the simulator
//! - platform bindings live with the board support code

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::identity::NodeAddress;

/// Point-to-point frame delivery between mesh nodes
#[async_trait]
pub trait MeshTransport: Send + Sync {
    /// Send a frame to a specific node
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unreachable or the send fails.
    async fn send(&self, dest: &NodeAddress, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Receive the next inbound frame
    ///
    /// Blocks until a frame is available. Returns the sender and the raw bytes.
    async fn recv(&self) -> Result<(NodeAddress, Vec<u8>), TransportError>;

    /// Check if the node is currently reachable
    fn is_connected(&self, dest: &NodeAddress) -> bool;

    /// All currently reachable nodes
    fn connected_peers(&self) -> Vec<NodeAddress>;

    /// Send with an upper bound on how long the transport may block.
    ///
    /// A stuck transport call surfaces as [`TransportError::Timeout`].
    async fn send_with_timeout(
        &self,
        dest: &NodeAddress,
        frame: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        match tokio::time::timeout(timeout, self.send(dest, frame)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                peer: dest.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
