//! Inbound command dispatch
//!
//! Every frame the transport delivers is classified by its tag byte and
//! either applied or dropped:
//!
//! | tag  | accepted when            | effect                          |
//! |------|--------------------------|---------------------------------|
//! | 0x56 | payload is whole entries | replace the route table cache   |
//! | 0x55 | length is exactly 7      | advisory keypress, logged       |
//! | else | never                    | dropped                         |
//!
//! Rejected frames never reach the cache. The error is returned to the
//! caller and the receive loop logs it and moves on.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

use chargemesh_core::{ChargeMeshError, MeshFrame, MeshTransport, NodeAddress};

use crate::cache::RouteTableCache;

/// What a successfully dispatched frame did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The cache now holds a table with this many entries
    RouteTableReplaced { entries: usize },
    /// A node announced a button press
    Keypress { origin: NodeAddress },
}

/// Applies inbound frames to the route table cache
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    cache: Arc<RouteTableCache>,
}

impl CommandDispatcher {
    /// Create a dispatcher writing into `cache`
    pub fn new(cache: Arc<RouteTableCache>) -> Self {
        Self { cache }
    }

    /// The cache this dispatcher writes into
    pub fn cache(&self) -> &Arc<RouteTableCache> {
        &self.cache
    }

    /// Decode one frame and apply it.
    ///
    /// Runs synchronously on the receiving task. The only wait is the cache
    /// lock, held elsewhere just long enough to clone one table, and the
    /// wait is capped by the cache's lock timeout.
    pub fn dispatch(&self, from: &NodeAddress, data: &[u8]) -> Result<Dispatched, ChargeMeshError> {
        match MeshFrame::decode(data, self.cache.capacity())? {
            MeshFrame::RouteTable(table) => {
                let entries = table.len();
                self.cache.replace(table)?;
                debug!(from = %from, entries, "Route table cache replaced");
                Ok(Dispatched::RouteTableReplaced { entries })
            }
            MeshFrame::Keypress(origin) => {
                info!(from = %from, origin = %origin, "Keypress received");
                Ok(Dispatched::Keypress { origin })
            }
        }
    }
}

/// Background loop feeding transport frames into a [`CommandDispatcher`]
pub struct ReceiveTask {
    transport: Arc<dyn MeshTransport>,
    dispatcher: CommandDispatcher,
    keypress_tx: Option<mpsc::Sender<NodeAddress>>,
}

impl ReceiveTask {
    /// Create a new receive task
    pub fn new(transport: Arc<dyn MeshTransport>, dispatcher: CommandDispatcher) -> Self {
        Self {
            transport,
            dispatcher,
            keypress_tx: None,
        }
    }

    /// Forward the origin of every accepted keypress to `tx`
    pub fn with_keypress_sink(mut self, tx: mpsc::Sender<NodeAddress>) -> Self {
        self.keypress_tx = Some(tx);
        self
    }

    /// Spawn the loop as a background task inside the caller's span
    pub fn spawn(self, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(
            async move {
                self.run(shutdown_rx).await;
            }
            .in_current_span(),
        )
    }

    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Receive loop started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Receive loop shutting down");
                    break;
                }
                received = self.transport.recv() => {
                    match received {
                        Ok((from, data)) => self.handle(&from, &data),
                        Err(e) => {
                            warn!(error = %e, "Transport closed, receive loop stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn handle(&self, from: &NodeAddress, data: &[u8]) {
        match self.dispatcher.dispatch(from, data) {
            Ok(Dispatched::Keypress { origin }) => {
                if let Some(tx) = &self.keypress_tx
                    && let Err(e) = tx.try_send(origin)
                {
                    debug!(origin = %origin, error = %e, "Keypress not forwarded");
                }
            }
            Ok(Dispatched::RouteTableReplaced { .. }) => {}
            Err(e) => {
                warn!(from = %from, len = data.len(), error = %e, "Dropping frame");
            }
        }
    }
}
