//! Mock transport implementation for testing
//!
//! Provides an in-memory mesh transport so dissemination and dispatch can be
//! exercised without radios. Frames travel over tokio channels; every
//! transport keeps one inbox and a map of outgoing channels to its peers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chargemesh_core::{MockTransportBuilder, MeshTransport, NodeAddress};
//!
//! let root = NodeAddress::new([0, 0, 0, 0, 0, 1]);
//! let leaf = NodeAddress::new([0, 0, 0, 0, 0, 2]);
//! let (t_root, t_leaf) = MockTransportBuilder::new().create_connected_pair(root, leaf);
//!
//! t_root.send(&leaf, vec![0x56]).await?;
//! let (from, frame) = t_leaf.recv().await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, mpsc};

use crate::error::TransportError;
use crate::identity::NodeAddress;
use crate::transport::MeshTransport;

/// Frame in flight between mock transports
#[derive(Debug, Clone)]
pub struct MockFrame {
    /// The sender of the frame
    pub sender: NodeAddress,
    /// The raw frame bytes
    pub data: Vec<u8>,
}

/// In-memory mesh transport
pub struct MockTransport {
    /// Our address
    local: NodeAddress,
    /// Outgoing channels to peers
    outgoing: DashMap<NodeAddress, mpsc::Sender<MockFrame>>,
    /// Incoming frame receiver
    inbox_rx: Arc<Mutex<mpsc::Receiver<MockFrame>>>,
    /// Incoming frame sender (handed to peers)
    inbox_tx: mpsc::Sender<MockFrame>,
    /// Destinations whose sends fail
    failing: DashSet<NodeAddress>,
    /// Successful sends, for assertions
    sent: AtomicUsize,
}

impl MockTransport {
    /// Create a new mock transport with the given address
    pub fn new(local: NodeAddress) -> Self {
        Self::with_buffer_size(local, 1024)
    }

    /// Create a new mock transport with a specific inbox size
    pub fn with_buffer_size(local: NodeAddress, buffer_size: usize) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(buffer_size);
        Self {
            local,
            outgoing: DashMap::new(),
            inbox_rx: Arc::new(Mutex::new(inbox_rx)),
            inbox_tx,
            failing: DashSet::new(),
            sent: AtomicUsize::new(0),
        }
    }

    /// Our address
    pub fn local_address(&self) -> &NodeAddress {
        &self.local
    }

    /// Sender other transports use to reach us
    pub fn inbox_sender(&self) -> mpsc::Sender<MockFrame> {
        self.inbox_tx.clone()
    }

    /// Open a one-way link to a peer
    pub fn connect_to(&self, peer: NodeAddress, peer_inbox: mpsc::Sender<MockFrame>) {
        self.outgoing.insert(peer, peer_inbox);
    }

    /// Drop the link to a peer
    pub fn disconnect_from(&self, peer: &NodeAddress) {
        self.outgoing.remove(peer);
    }

    /// Make every send to `peer` fail until [`Self::clear_failures`]
    pub fn fail_sends_to(&self, peer: NodeAddress) {
        self.failing.insert(peer);
    }

    /// Remove all injected send failures
    pub fn clear_failures(&self) {
        self.failing.clear();
    }

    /// Number of frames successfully sent
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }

    /// Deliver a raw frame to our own inbox as if `from` had sent it
    pub async fn inject(&self, from: NodeAddress, data: Vec<u8>) -> Result<(), TransportError> {
        self.inbox_tx
            .send(MockFrame { sender: from, data })
            .await
            .map_err(|_| TransportError::SendFailed("inbox closed".into()))
    }
}

#[async_trait]
impl MeshTransport for MockTransport {
    async fn send(&self, dest: &NodeAddress, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.failing.contains(dest) {
            return Err(TransportError::SendFailed(format!(
                "injected failure for {}",
                dest
            )));
        }

        // Clone the sender so no map guard is held across the await
        let sender = self
            .outgoing
            .get(dest)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::PeerNotConnected(dest.to_string()))?;

        sender
            .send(MockFrame {
                sender: self.local,
                data: frame,
            })
            .await
            .map_err(|_| TransportError::SendFailed("channel closed".into()))?;

        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn recv(&self) -> Result<(NodeAddress, Vec<u8>), TransportError> {
        let mut inbox = self.inbox_rx.lock().await;
        let frame = inbox
            .recv()
            .await
            .ok_or_else(|| TransportError::ReceiveFailed("channel closed".into()))?;
        Ok((frame.sender, frame.data))
    }

    fn is_connected(&self, dest: &NodeAddress) -> bool {
        self.outgoing.contains_key(dest)
    }

    fn connected_peers(&self) -> Vec<NodeAddress> {
        self.outgoing.iter().map(|entry| *entry.key()).collect()
    }
}

/// Builder for interconnected mock transports
pub struct MockTransportBuilder {
    buffer_size: usize,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransportBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self { buffer_size: 1024 }
    }

    /// Set the inbox size for every transport
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Create a pair of connected mock transports
    pub fn create_connected_pair(
        &self,
        a: NodeAddress,
        b: NodeAddress,
    ) -> (MockTransport, MockTransport) {
        let transport_a = MockTransport::with_buffer_size(a, self.buffer_size);
        let transport_b = MockTransport::with_buffer_size(b, self.buffer_size);

        transport_a.connect_to(b, transport_b.inbox_sender());
        transport_b.connect_to(a, transport_a.inbox_sender());

        (transport_a, transport_b)
    }

    /// Create a fully connected set of transports.
    ///
    /// A mesh transport reaches every node in the mesh point-to-point
    /// regardless of the tree shape underneath, so this is the usual setup.
    pub fn create_full_mesh(&self, addrs: &[NodeAddress]) -> HashMap<NodeAddress, Arc<MockTransport>> {
        let transports: HashMap<NodeAddress, Arc<MockTransport>> = addrs
            .iter()
            .map(|addr| {
                (
                    *addr,
                    Arc::new(MockTransport::with_buffer_size(*addr, self.buffer_size)),
                )
            })
            .collect();

        for (a, transport_a) in &transports {
            for (b, transport_b) in &transports {
                if a != b {
                    transport_a.connect_to(*b, transport_b.inbox_sender());
                }
            }
        }

        transports
    }
}
