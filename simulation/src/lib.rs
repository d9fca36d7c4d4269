//! # ChargeMesh Simulation
//!
//! Runs a whole charging mesh inside one process. Every node is a real
//! [`MeshNode`](chargemesh_node::MeshNode); only the radio and the broker are
//! replaced, by the mock transport and a publisher that logs.
//!
//! - **Topology** (`topology.rs`): tree layout, addresses and per-node
//!   routing tables
//! - **Publisher** (`publisher.rs`): logging broker stand-in
//! - **Scenarios** (`scenarios.rs`): timed runs driven by occupancy lists and
//!   button presses

pub mod publisher;
pub mod scenarios;
pub mod topology;

pub use publisher::LoggingPublisher;
pub use scenarios::{NodeSummary, SimConfig, SimReport, run};
pub use topology::{MeshTree, SimNodeSpec};
