//! # ChargeMesh Core
//!
//! Core types, the mesh wire codec, and the platform abstractions shared by
//! every ChargeMesh crate.
//!
//! The mesh stack itself (topology formation, parent election, routing table
//! maintenance) belongs to the platform. This crate only describes what the
//! rest of the firmware needs from it, so the same dissemination and
//! arbitration logic runs against real radios and in-memory mocks.
//!
//! ## Key Traits
//!
//! - [`MeshTransport`]: point-to-point frame delivery between mesh nodes
//! - [`MeshLayer`]: read access to the platform's routing table and link status
//!
//! ## Key Types
//!
//! - [`NodeAddress`]: 6-byte hardware address of a mesh node
//! - [`RouteTable`]: bounded, ordered list of node addresses
//! - [`MeshFrame`]: decoded mesh command (route table snapshot or keypress)
//! - [`MeshEvent`]: platform notifications the node reacts to

pub mod error;
pub mod event;
pub mod frame;
pub mod identity;
pub mod mesh;
pub mod mock_transport;
pub mod route_table;
pub mod transport;

// Re-export main types
pub use error::*;
pub use event::*;
pub use frame::*;
pub use identity::*;
pub use mesh::*;
pub use mock_transport::*;
pub use route_table::*;
pub use transport::*;
