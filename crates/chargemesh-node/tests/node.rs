//! End-to-end tests for mesh nodes over the mock transport

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use chargemesh_arbitration::{CHARGE_QUEUE_TOPIC, MatchRule, RecordingPublisher};
use chargemesh_core::{MeshEvent, MockMeshLayer, MockTransportBuilder, NodeAddress};
use chargemesh_node::{MeshNode, NodeConfig, NodeError};

fn addr(n: u8) -> NodeAddress {
    NodeAddress::new([0x24, 0x0a, 0xc4, 0, 0, n])
}

fn fast_config() -> NodeConfig {
    NodeConfig::default()
        .with_dissemination_interval(Duration::from_millis(20))
        .with_send_timeout(Duration::from_millis(100))
}

struct TestMesh {
    nodes: HashMap<NodeAddress, MeshNode>,
    publishers: HashMap<NodeAddress, Arc<RecordingPublisher>>,
}

/// Root is addr(1); every node's platform table lists all nodes, root first
async fn build_mesh(count: u8, config: NodeConfig) -> TestMesh {
    let addrs: Vec<_> = (1..=count).map(addr).collect();
    let transports = MockTransportBuilder::new().create_full_mesh(&addrs);

    let mut nodes = HashMap::new();
    let mut publishers = HashMap::new();
    for (i, a) in addrs.iter().enumerate() {
        let mesh = if i == 0 {
            MockMeshLayer::root(addrs.clone())
        } else {
            MockMeshLayer::node(vec![*a], 2)
        };
        let publisher = Arc::new(RecordingPublisher::new());
        let node = MeshNode::new(
            *a,
            config.clone(),
            transports[a].clone(),
            Arc::new(mesh),
            publisher.clone(),
        )
        .unwrap();
        node.start().await.unwrap();

        nodes.insert(*a, node);
        publishers.insert(*a, publisher);
    }

    TestMesh { nodes, publishers }
}

impl TestMesh {
    async fn stop(self) {
        for node in self.nodes.values() {
            node.stop().await.unwrap();
        }
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_route_table_reaches_every_node() {
    let mesh = build_mesh(4, fast_config()).await;

    for n in 2..=4 {
        let node = &mesh.nodes[&addr(n)];
        eventually(|| node.context().cache().snapshot().unwrap().len() == 4).await;
        let snap = node.context().cache().snapshot().unwrap();
        assert_eq!(snap.root(), Some(&addr(1)));
    }

    // The root never sends to itself
    assert_eq!(mesh.nodes[&addr(1)].context().cache().version(), 0);

    mesh.stop().await;
}

#[tokio::test]
async fn test_address_assignment_announces_c() {
    let mesh = build_mesh(2, fast_config()).await;
    let node = &mesh.nodes[&addr(2)];
    let publisher = &mesh.publishers[&addr(2)];

    node.mesh_event(MeshEvent::AddressAssigned(Ipv4Addr::new(10, 0, 0, 7)))
        .await
        .unwrap();

    eventually(|| publisher.last_payload("10.0.0.7").is_some()).await;
    assert_eq!(publisher.last_payload("10.0.0.7").as_deref(), Some("C"));
    assert_eq!(publisher.last_payload("/WHOISHERE").as_deref(), Some("NODE - 10.0.0.7"));
    assert_eq!(node.context().engine().token().as_str(), "7");

    mesh.stop().await;
}

#[tokio::test]
async fn test_occupancy_and_button_flow() {
    let mesh = build_mesh(2, fast_config()).await;
    let node = &mesh.nodes[&addr(2)];
    let publisher = &mesh.publishers[&addr(2)];

    node.mesh_event(MeshEvent::AddressAssigned(Ipv4Addr::new(10, 0, 0, 7)))
        .await
        .unwrap();
    node.occupancy_received("7").await.unwrap();
    eventually(|| publisher.last_payload("10.0.0.7").as_deref() == Some("A")).await;

    node.occupancy_received("3,4").await.unwrap();
    eventually(|| publisher.last_payload("10.0.0.7").as_deref() == Some("C")).await;

    node.button_pressed().await.unwrap();
    eventually(|| publisher.last_payload(CHARGE_QUEUE_TOPIC).is_some()).await;
    assert_eq!(publisher.last_payload(CHARGE_QUEUE_TOPIC).as_deref(), Some("7 - 7"));

    mesh.stop().await;
}

#[tokio::test]
async fn test_occupancy_before_address_is_ignored() {
    let mesh = build_mesh(1, fast_config()).await;
    let node = &mesh.nodes[&addr(1)];
    let publisher = &mesh.publishers[&addr(1)];

    node.occupancy_received("1").await.unwrap();
    node.mesh_event(MeshEvent::AddressAssigned(Ipv4Addr::new(10, 0, 0, 1)))
        .await
        .unwrap();

    // Triggers are handled in order: the announcement follows the ignored list
    eventually(|| publisher.last_payload("10.0.0.1").is_some()).await;
    assert!(publisher.last_payload("0.0.0.0").is_none());
    assert_eq!(publisher.last_payload("10.0.0.1").as_deref(), Some("C"));

    mesh.stop().await;
}

#[tokio::test]
async fn test_button_announces_keypress_to_root() {
    let mesh = build_mesh(3, fast_config()).await;
    let leaf = &mesh.nodes[&addr(3)];
    let root = &mesh.nodes[&addr(1)];

    eventually(|| leaf.context().cache().snapshot().unwrap().len() == 3).await;
    leaf.button_pressed().await.unwrap();

    eventually(|| root.context().keypresses_received() == 1).await;

    // The root pressing its own button sends nothing
    root.button_pressed().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(root.context().keypresses_received(), 1);

    mesh.stop().await;
}

#[tokio::test]
async fn test_keypress_announcement_can_be_disabled() {
    let mesh = build_mesh(2, fast_config().with_announce_keypress(false)).await;
    let leaf = &mesh.nodes[&addr(2)];
    let root = &mesh.nodes[&addr(1)];

    eventually(|| leaf.context().cache().snapshot().unwrap().len() == 2).await;
    leaf.button_pressed().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(root.context().keypresses_received(), 0);

    mesh.stop().await;
}

#[tokio::test]
async fn test_match_rule_from_config() {
    let mesh = build_mesh(1, fast_config().with_match_rule(MatchRule::Exact)).await;
    let node = &mesh.nodes[&addr(1)];
    let publisher = &mesh.publishers[&addr(1)];

    node.mesh_event(MeshEvent::AddressAssigned(Ipv4Addr::new(10, 0, 0, 1)))
        .await
        .unwrap();
    node.occupancy_received("12").await.unwrap();
    node.occupancy_received("1").await.unwrap();

    eventually(|| publisher.last_payload("10.0.0.1").as_deref() == Some("A")).await;
    let states: Vec<_> = publisher
        .published()
        .into_iter()
        .filter(|p| p.topic == "10.0.0.1")
        .map(|p| p.payload)
        .collect();
    assert_eq!(states, vec!["C", "C", "A"]);

    mesh.stop().await;
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let transport = Arc::new(chargemesh_core::MockTransport::new(addr(1)));
    let node = MeshNode::new(
        addr(1),
        fast_config(),
        transport,
        Arc::new(MockMeshLayer::new()),
        Arc::new(RecordingPublisher::new()),
    )
    .unwrap();

    assert!(matches!(node.button_pressed().await, Err(NodeError::NotStarted)));

    node.start().await.unwrap();
    assert!(matches!(node.start().await, Err(NodeError::AlreadyStarted)));
    assert!(node.is_started());

    node.stop().await.unwrap();
    assert!(!node.is_started());
    assert!(matches!(node.button_pressed().await, Err(NodeError::NotStarted)));

    let invalid = NodeConfig::default().with_route_table_capacity(0);
    let result = MeshNode::new(
        addr(2),
        invalid,
        Arc::new(chargemesh_core::MockTransport::new(addr(2))),
        Arc::new(MockMeshLayer::new()),
        Arc::new(RecordingPublisher::new()),
    );
    assert!(matches!(result, Err(NodeError::Config(_))));
}
