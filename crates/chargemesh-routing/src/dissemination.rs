//! Route table dissemination loop
//!
//! Every interval the node reads its platform routing table, encodes it as a
//! ROUTE_TABLE frame and sends it point-to-point to every listed node except
//! index 0, the coordinating node.
//!
//! Delivery is at most once per tick. A failed or timed-out send is logged
//! and not retried; the next tick re-sends whatever the table is by then.
//!
//! ```text
//! IDLE --tick--> SEND --all destinations tried--> IDLE
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, warn};

use chargemesh_core::{
    DEFAULT_ROUTE_TABLE_CAPACITY, MeshFrame, MeshLayer, MeshTransport, NodeAddress,
};

/// Dissemination timing and bounds
#[derive(Debug, Clone)]
pub struct DisseminationConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Upper bound on a single point-to-point send
    pub send_timeout: Duration,
    /// Maximum route table entries read from the platform
    pub capacity: usize,
}

impl Default for DisseminationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            send_timeout: Duration::from_secs(1),
            capacity: DEFAULT_ROUTE_TABLE_CAPACITY,
        }
    }
}

/// Outcome of one dissemination tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries in the table that was sent
    pub table_size: usize,
    /// Destinations a send was attempted to
    pub attempted: usize,
    /// Destinations that accepted the frame
    pub delivered: usize,
    /// Destinations whose send failed or timed out
    pub failed: Vec<NodeAddress>,
}

/// Periodic route table broadcaster
pub struct DisseminationTask {
    transport: Arc<dyn MeshTransport>,
    mesh: Arc<dyn MeshLayer>,
    config: DisseminationConfig,
    tick_count: u64,
}

impl DisseminationTask {
    /// Create a new dissemination task
    pub fn new(
        transport: Arc<dyn MeshTransport>,
        mesh: Arc<dyn MeshLayer>,
        config: DisseminationConfig,
    ) -> Self {
        Self {
            transport,
            mesh,
            config,
            tick_count: 0,
        }
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

    /// Number of completed ticks
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Dissemination loop started"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(ticks = self.tick_count, "Dissemination loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.tick().await;
                    if !report.failed.is_empty() {
                        warn!(
                            failed = report.failed.len(),
                            delivered = report.delivered,
                            "Route table not delivered to every node this tick"
                        );
                    }
                }
            }
        }
    }

    /// Run a single dissemination round
    pub async fn tick(&mut self) -> TickReport {
        self.tick_count += 1;

        let table = self.mesh.routing_table(self.config.capacity);
        let frame = MeshFrame::RouteTable(table.clone()).encode();

        let mut report = TickReport {
            table_size: table.len(),
            ..Default::default()
        };

        // Index 0 is the coordinating node and is never a forwarding target
        for (index, dest) in table.entries().iter().enumerate().skip(1) {
            report.attempted += 1;

            match self
                .transport
                .send_with_timeout(dest, frame.clone(), self.config.send_timeout)
                .await
            {
                Ok(()) => {
                    report.delivered += 1;
                    debug!(index, dest = %dest, "Sent routing table");
                }
                Err(e) => {
                    report.failed.push(*dest);
                    warn!(index, dest = %dest, error = %e, "Failed to send routing table");
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargemesh_core::{MockMeshLayer, MockTransport, MockTransportBuilder};
    use std::collections::HashMap;

    fn addr(n: u8) -> NodeAddress {
        NodeAddress::new([0x24, 0x0a, 0, 0, 0, n])
    }

    fn mesh_of(n: u8) -> (Vec<NodeAddress>, HashMap<NodeAddress, Arc<MockTransport>>) {
        let addrs: Vec<_> = (1..=n).map(addr).collect();
        let transports = MockTransportBuilder::new().create_full_mesh(&addrs);
        (addrs, transports)
    }

    fn task_for(
        transport: Arc<MockTransport>,
        mesh: Arc<MockMeshLayer>,
    ) -> DisseminationTask {
        DisseminationTask::new(
            transport,
            mesh,
            DisseminationConfig {
                send_timeout: Duration::from_millis(100),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_tick_sends_to_all_but_root() {
        let (addrs, transports) = mesh_of(4);
        let root = Arc::clone(&transports[&addr(1)]);
        let mesh = Arc::new(MockMeshLayer::root(addrs.clone()));
        let mut task = task_for(Arc::clone(&root), mesh);

        let report = task.tick().await;

        assert_eq!(report.table_size, 4);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 3);
        assert!(report.failed.is_empty());
        assert_eq!(root.sent_count(), 3);

        for n in 2..=4 {
            let (from, frame) = transports[&addr(n)].recv().await.unwrap();
            assert_eq!(from, addr(1));
            let decoded = MeshFrame::decode(&frame, 50).unwrap();
            match decoded {
                MeshFrame::RouteTable(t) => assert_eq!(t.entries(), addrs.as_slice()),
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_tick_sends_nothing_for_small_tables() {
        let (_, transports) = mesh_of(2);
        let root = Arc::clone(&transports[&addr(1)]);

        for routes in [vec![], vec![addr(1)]] {
            let mesh = Arc::new(MockMeshLayer::root(routes));
            let mut task = task_for(Arc::clone(&root), mesh);
            let report = task.tick().await;
            assert_eq!(report.attempted, 0);
        }
        assert_eq!(root.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_sends() {
        let (addrs, transports) = mesh_of(5);
        let root = Arc::clone(&transports[&addr(1)]);
        root.fail_sends_to(addr(2));
        root.fail_sends_to(addr(4));

        let mesh = Arc::new(MockMeshLayer::root(addrs));
        let mut task = task_for(Arc::clone(&root), mesh);
        let report = task.tick().await;

        assert_eq!(report.attempted, 4);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec![addr(2), addr(4)]);
        assert!(transports[&addr(3)].recv().await.is_ok());
        assert!(transports[&addr(5)].recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_destination_counts_as_failure() {
        let root = Arc::new(MockTransport::new(addr(1)));
        let mesh = Arc::new(MockMeshLayer::root(vec![addr(1), addr(7)]));
        let mut task = task_for(root, mesh);

        let report = task.tick().await;
        assert_eq!(report.failed, vec![addr(7)]);
    }

    #[tokio::test]
    async fn test_each_tick_resends_current_table() {
        let (addrs, transports) = mesh_of(3);
        let root = Arc::clone(&transports[&addr(1)]);
        let mesh = Arc::new(MockMeshLayer::root(addrs.clone()));
        let mut task = task_for(Arc::clone(&root), Arc::clone(&mesh));

        task.tick().await;
        mesh.set_routes(vec![addr(1), addr(3)]);
        let report = task.tick().await;

        assert_eq!(report.attempted, 1);
        assert_eq!(task.tick_count(), 2);
        assert_eq!(root.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_spawned_loop_stops_on_shutdown() {
        let (addrs, transports) = mesh_of(2);
        let root = Arc::clone(&transports[&addr(1)]);
        let mesh = Arc::new(MockMeshLayer::root(addrs));
        let task = DisseminationTask::new(
            Arc::clone(&root) as Arc<dyn MeshTransport>,
            mesh,
            DisseminationConfig {
                interval: Duration::from_millis(10),
                ..Default::default()
            },
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = task.spawn(shutdown_rx);

        // First tick fires immediately
        let (from, _) = transports[&addr(2)].recv().await.unwrap();
        assert_eq!(from, addr(1));

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop")
            .unwrap();
    }
}
