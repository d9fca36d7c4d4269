//! # ChargeMesh Routing
//!
//! Keeps every node's view of mesh membership in step with the root.
//!
//! - [`DisseminationTask`]: periodic push of the platform routing table to
//!   every non-root node
//! - [`CommandDispatcher`] / [`ReceiveTask`]: decode inbound frames and apply
//!   them to the local cache
//! - [`RouteTableCache`]: lock-guarded latest snapshot, read by the
//!   arbitration and keypress paths
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chargemesh_routing::{CommandDispatcher, DisseminationConfig, DisseminationTask, RouteTableCache};
//!
//! let cache = Arc::new(RouteTableCache::new(50));
//! let dispatcher = CommandDispatcher::new(Arc::clone(&cache));
//!
//! let task = DisseminationTask::new(transport, mesh, DisseminationConfig::default());
//! let handle = task.spawn(shutdown_rx);
//! ```

pub mod cache;
pub mod dispatcher;
pub mod dissemination;

pub use cache::{DEFAULT_LOCK_TIMEOUT, RouteTableCache};
pub use dispatcher::{CommandDispatcher, Dispatched, ReceiveTask};
pub use dissemination::{DisseminationConfig, DisseminationTask, TickReport};
