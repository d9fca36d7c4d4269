//! Simulation runs
//!
//! A run builds a [`MeshTree`], starts one [`MeshNode`] per tree node over a
//! fully connected mock transport, assigns every node its address, then
//! drives the mesh with broker occupancy lists and random button presses
//! until the configured duration has passed.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use chargemesh_arbitration::{CHARGE_QUEUE_TOPIC, ChargerToken};
use chargemesh_core::{MeshEvent, MockMeshLayer, MockTransportBuilder, NodeAddress};
use chargemesh_node::{MeshNode, NodeConfig};

use crate::publisher::LoggingPublisher;
use crate::topology::MeshTree;

/// Parameters of one simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub nodes: usize,
    /// Children per node in the mesh tree, `mesh.ap_connections` when unset
    pub fanout: Option<usize>,
    pub duration: Duration,
    /// Time between broker occupancy lists
    pub occupancy_interval: Duration,
    /// Chance per node per occupancy round of a button press
    pub button_probability: f64,
    /// Fixed occupancy list; random lists when unset
    pub occupancy: Option<String>,
    pub seed: Option<u64>,
    pub node: NodeConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: 5,
            fanout: None,
            duration: Duration::from_secs(10),
            occupancy_interval: Duration::from_secs(1),
            button_probability: 0.1,
            occupancy: None,
            seed: None,
            node: NodeConfig::default(),
        }
    }
}

/// Final state of one node
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub address: NodeAddress,
    pub ip: String,
    pub token: String,
    pub layer: i32,
    pub cached_routes: usize,
    pub state: String,
    pub charge_queue: Option<String>,
    pub keypresses_received: u64,
    pub publications: usize,
}

/// Outcome of a run
#[derive(Debug, Clone, Default)]
pub struct SimReport {
    pub nodes: Vec<NodeSummary>,
    pub occupancy_rounds: usize,
    pub button_presses: usize,
}

impl SimReport {
    /// Whether every node's cache holds a table rooted at the mesh root
    pub fn routes_converged(&self) -> bool {
        self.nodes.iter().skip(1).all(|n| n.cached_routes > 0)
    }
}

impl Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<19} {:<12} {:>5} {:>5} {:>6} {:>5} {:<10} {:>4}",
            "address", "ip", "token", "layer", "routes", "state", "chargeQ", "keys"
        )?;
        for n in &self.nodes {
            writeln!(
                f,
                "{:<19} {:<12} {:>5} {:>5} {:>6} {:>5} {:<10} {:>4}",
                n.address.to_string(),
                n.ip,
                n.token,
                n.layer,
                n.cached_routes,
                n.state,
                n.charge_queue.as_deref().unwrap_or("-"),
                n.keypresses_received
            )?;
        }
        write!(
            f,
            "{} occupancy rounds, {} button presses",
            self.occupancy_rounds, self.button_presses
        )
    }
}

/// Random occupancy list drawn from the tokens present in the mesh
fn random_occupancy(rng: &mut impl Rng, tokens: &[ChargerToken]) -> String {
    let count = rng.random_range(0..=tokens.len().min(3));
    (0..count)
        .map(|_| tokens[rng.random_range(0..tokens.len())].to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Run a simulation to completion
pub async fn run(config: SimConfig) -> anyhow::Result<SimReport> {
    anyhow::ensure!(config.nodes > 0, "a mesh needs at least one node");
    let button_probability = config.button_probability.clamp(0.0, 1.0);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mesh_settings = &config.node.mesh;
    let ap_connections = usize::from(mesh_settings.ap_connections);
    let fanout = config.fanout.unwrap_or(ap_connections);
    anyhow::ensure!(
        fanout <= ap_connections,
        "fanout {} exceeds mesh.ap_connections {}",
        fanout,
        ap_connections
    );

    let tree = MeshTree::new(config.nodes, fanout);
    anyhow::ensure!(
        tree.depth() <= i32::from(mesh_settings.max_layer),
        "{} nodes at fanout {} need {} layers, mesh.max_layer is {}",
        config.nodes,
        fanout,
        tree.depth(),
        mesh_settings.max_layer
    );
    info!(nodes = tree.len(), "Building mesh\n{}", tree.visualize());

    let addrs: Vec<_> = tree.nodes().iter().map(|n| n.address).collect();
    let transports = MockTransportBuilder::new().create_full_mesh(&addrs);

    let mut nodes = Vec::with_capacity(tree.len());
    let mut publishers = HashMap::new();
    for spec in tree.nodes() {
        let mesh = Arc::new(MockMeshLayer::node(tree.routing_table(spec.index), spec.layer));
        mesh.set_root(spec.parent.is_none());
        mesh.set_rssi(rng.random_range(-85..=-40));

        let publisher = Arc::new(LoggingPublisher::new(spec.address.short_id()));
        let transport = transports
            .get(&spec.address)
            .cloned()
            .context("transport missing for node")?;

        let node = MeshNode::new(
            spec.address,
            config.node.clone(),
            transport,
            mesh,
            publisher.clone(),
        )?;
        node.start().await?;

        publishers.insert(spec.address, publisher);
        nodes.push(node);
    }

    for (node, spec) in nodes.iter().zip(tree.nodes()) {
        node.mesh_event(MeshEvent::Started).await?;
        node.mesh_event(MeshEvent::AddressAssigned(spec.ip)).await?;
    }

    let tokens: Vec<_> = tree
        .nodes()
        .iter()
        .map(|n| ChargerToken::from_ipv4(n.ip))
        .collect();

    let mut report = SimReport::default();
    let deadline = tokio::time::Instant::now() + config.duration;
    let mut interval = tokio::time::interval(config.occupancy_interval);

    loop {
        interval.tick().await;
        if tokio::time::Instant::now() >= deadline {
            break;
        }

        let list = config
            .occupancy
            .clone()
            .unwrap_or_else(|| random_occupancy(&mut rng, &tokens));
        info!(list = %list, "Broker occupancy update");
        for node in &nodes {
            node.occupancy_received(list.clone()).await?;
        }
        report.occupancy_rounds += 1;

        for node in &nodes {
            if rng.random_bool(button_probability) {
                node.button_pressed().await?;
                report.button_presses += 1;
            }
        }
    }

    // Let in-flight triggers drain before reading final state
    tokio::time::sleep(Duration::from_millis(50)).await;

    for (node, spec) in nodes.iter().zip(tree.nodes()) {
        let ctx = node.context();
        let ip = spec.ip.to_string();
        let publisher = &publishers[&spec.address];

        report.nodes.push(NodeSummary {
            address: spec.address,
            token: ctx.engine().token().to_string(),
            layer: spec.layer,
            cached_routes: ctx.cache().snapshot().map(|t| t.len()).unwrap_or(0),
            state: ctx.engine().state().to_string(),
            charge_queue: publisher.last_payload(CHARGE_QUEUE_TOPIC),
            keypresses_received: ctx.keypresses_received(),
            publications: publisher.published().len(),
            ip,
        });
    }

    for node in &nodes {
        node.stop().await?;
    }

    Ok(report)
}
