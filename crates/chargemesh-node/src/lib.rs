//! # ChargeMesh Node
//!
//! Wires the routing and arbitration crates into a running node.
//!
//! ## Lifecycle
//!
//! ```rust,ignore
//! use chargemesh_node::{MeshNode, NodeConfig};
//!
//! let node = MeshNode::new(address, NodeConfig::default(), transport, mesh, publisher)?;
//! node.start().await?;
//!
//! node.mesh_event(MeshEvent::AddressAssigned(ip)).await?;  // announces "C"
//! node.occupancy_received("7,12").await?;                  // publishes A/B/C
//! node.button_pressed().await?;                            // publishes chargeQ
//!
//! node.stop().await?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod node;

pub use config::{MeshSettings, NodeConfig};
pub use context::NodeContext;
pub use error::{ConfigError, NodeError, NodeResult};
pub use node::{MeshNode, NodeTrigger};
