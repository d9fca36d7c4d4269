//! Mesh node coordinator
//!
//! A started node runs three background tasks, all stopped by one shutdown
//! broadcast:
//!
//! - dissemination: pushes the platform routing table every interval
//! - receive: decodes inbound frames into the route table cache
//! - trigger: serializes broker occupancy lists, button presses, mesh events
//!   and inbound keypress notifications

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use chargemesh_arbitration::Publisher;
use chargemesh_core::{MeshEvent, MeshFrame, MeshLayer, MeshTransport, NodeAddress};
use chargemesh_logging::NodeContextGuard;
use chargemesh_routing::{CommandDispatcher, DisseminationTask, ReceiveTask};

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::error::{NodeError, NodeResult};

/// Input delivered to the trigger task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTrigger {
    /// Comma-delimited occupancy list from the broker
    Occupancy(String),
    /// The local button was pressed
    Button,
    /// Notification from the platform mesh stack
    Mesh(MeshEvent),
}

/// One node of the charging mesh
pub struct MeshNode {
    ctx: Arc<NodeContext>,
    trigger_tx: RwLock<Option<mpsc::Sender<NodeTrigger>>>,
    shutdown_tx: broadcast::Sender<()>,
    background_tasks: RwLock<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl MeshNode {
    /// Create a node. Nothing runs until [`start`](Self::start).
    pub fn new(
        address: NodeAddress,
        config: NodeConfig,
        transport: Arc<dyn MeshTransport>,
        mesh: Arc<dyn MeshLayer>,
        publisher: Arc<dyn Publisher>,
    ) -> NodeResult<Self> {
        config.validate()?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let ctx = NodeContext::new(address, config, transport, mesh, publisher);

        info!(node = %address, "Node created");

        Ok(Self {
            ctx: Arc::new(ctx),
            trigger_tx: RwLock::new(None),
            shutdown_tx,
            background_tasks: RwLock::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Spawn the background tasks
    #[instrument(skip(self), fields(node = %self.ctx.address()))]
    pub async fn start(&self) -> NodeResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(NodeError::AlreadyStarted);
        }

        let capacity = self.ctx.config().channel_capacity;
        let (trigger_tx, trigger_rx) = mpsc::channel(capacity);
        let (keypress_tx, keypress_rx) = mpsc::channel(capacity);

        let tasks = self.spawn_tasks(trigger_rx, keypress_tx, keypress_rx);

        *self.trigger_tx.write().await = Some(trigger_tx);
        self.background_tasks.write().await.extend(tasks);

        info!("Node started");
        Ok(())
    }

    fn spawn_tasks(
        &self,
        trigger_rx: mpsc::Receiver<NodeTrigger>,
        keypress_tx: mpsc::Sender<NodeAddress>,
        keypress_rx: mpsc::Receiver<NodeAddress>,
    ) -> Vec<JoinHandle<()>> {
        let span = {
            let _ctx = NodeContextGuard::new(self.ctx.address());
            info_span!("node", id = %self.ctx.address().short_id())
        };
        let _entered = span.enter();

        let dissemination = DisseminationTask::new(
            Arc::clone(self.ctx.transport()),
            Arc::clone(self.ctx.mesh()),
            self.ctx.config().dissemination(),
        )
        .spawn(self.shutdown_tx.subscribe());

        let receive = ReceiveTask::new(
            Arc::clone(self.ctx.transport()),
            CommandDispatcher::new(Arc::clone(self.ctx.cache())),
        )
        .with_keypress_sink(keypress_tx)
        .spawn(self.shutdown_tx.subscribe());

        let trigger = TriggerTask {
            ctx: Arc::clone(&self.ctx),
        }
        .spawn(trigger_rx, keypress_rx, self.shutdown_tx.subscribe());

        vec![dissemination, receive, trigger]
    }

    /// Signal shutdown and wait for every task
    #[instrument(skip(self), fields(node = %self.ctx.address()))]
    pub async fn stop(&self) -> NodeResult<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let _ = self.shutdown_tx.send(());
        self.trigger_tx.write().await.take();

        let mut tasks = self.background_tasks.write().await;
        for task in tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        info!("Node stopped");
        Ok(())
    }

    async fn trigger(&self, trigger: NodeTrigger) -> NodeResult<()> {
        let tx = self
            .trigger_tx
            .read()
            .await
            .clone()
            .ok_or(NodeError::NotStarted)?;
        tx.send(trigger).await?;
        Ok(())
    }

    /// Hand a broker occupancy list to the node
    pub async fn occupancy_received(&self, raw: impl Into<String>) -> NodeResult<()> {
        self.trigger(NodeTrigger::Occupancy(raw.into())).await
    }

    /// Report a press of the local button
    pub async fn button_pressed(&self) -> NodeResult<()> {
        self.trigger(NodeTrigger::Button).await
    }

    /// Forward a platform mesh event
    pub async fn mesh_event(&self, event: MeshEvent) -> NodeResult<()> {
        self.trigger(NodeTrigger::Mesh(event)).await
    }

    pub fn context(&self) -> &Arc<NodeContext> {
        &self.ctx
    }

    pub fn address(&self) -> &NodeAddress {
        self.ctx.address()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Serializes every event that drives arbitration
struct TriggerTask {
    ctx: Arc<NodeContext>,
}

impl TriggerTask {
    fn spawn(
        self,
        trigger_rx: mpsc::Receiver<NodeTrigger>,
        keypress_rx: mpsc::Receiver<NodeAddress>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(
            async move {
                self.run(trigger_rx, keypress_rx, shutdown_rx).await;
            }
            .in_current_span(),
        )
    }

    async fn run(
        self,
        mut trigger_rx: mpsc::Receiver<NodeTrigger>,
        mut keypress_rx: mpsc::Receiver<NodeAddress>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!("Trigger loop started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Trigger loop shutting down");
                    break;
                }
                Some(trigger) = trigger_rx.recv() => self.handle(trigger).await,
                Some(origin) = keypress_rx.recv() => {
                    self.ctx.record_keypress();
                    debug!(origin = %origin, "Keypress recorded");
                }
                else => break,
            }
        }
    }

    async fn handle(&self, trigger: NodeTrigger) {
        match trigger {
            NodeTrigger::Occupancy(raw) => self.on_occupancy(&raw).await,
            NodeTrigger::Button => self.on_button().await,
            NodeTrigger::Mesh(event) => self.on_mesh_event(event).await,
        }
    }

    async fn on_occupancy(&self, raw: &str) {
        if self.ctx.engine().address().is_none() {
            warn!(list = raw, "Occupancy list before address assignment, ignoring");
            return;
        }

        let routes = match self.ctx.cache().snapshot() {
            Ok(table) => table.len(),
            Err(e) => {
                warn!(error = %e, "Route table unavailable");
                0
            }
        };
        let state = self.ctx.engine().on_occupancy(raw).await;
        info!(list = raw, state = %state, known_nodes = routes, "Arbitration updated");
    }

    async fn on_button(&self) {
        self.ctx.engine().on_button().await;

        if self.ctx.config().announce_keypress && !self.ctx.mesh().is_root() {
            self.announce_keypress().await;
        }
    }

    /// Tell the coordinating node about a local button press
    async fn announce_keypress(&self) {
        let root = match self.ctx.cache().snapshot() {
            Ok(table) => table.root().copied(),
            Err(e) => {
                warn!(error = %e, "Route table unavailable, keypress not announced");
                return;
            }
        };

        let Some(root) = root else {
            debug!("No route table yet, keypress not announced");
            return;
        };
        if root == *self.ctx.address() {
            return;
        }

        let frame = MeshFrame::Keypress(*self.ctx.address()).encode();
        match self
            .ctx
            .transport()
            .send_with_timeout(&root, frame, self.ctx.config().send_timeout())
            .await
        {
            Ok(()) => debug!(root = %root, "Keypress announced"),
            Err(e) => warn!(root = %root, error = %e, "Failed to announce keypress"),
        }
    }

    async fn on_mesh_event(&self, event: MeshEvent) {
        info!(event = %event, "Mesh event");

        if let MeshEvent::AddressAssigned(ip) = event {
            let first = self.ctx.engine().address().is_none();
            if self.ctx.engine().set_address(ip) && first {
                self.ctx.engine().announce().await;
            }
        }
    }
}
