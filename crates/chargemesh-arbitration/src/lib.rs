//! # ChargeMesh Arbitration
//!
//! Decides which node holds the shared charging slot.
//!
//! Each node's [`ChargerToken`] is the last segment of its network address.
//! The broker publishes an occupancy list of tokens; every node looks for
//! its own token in that list and reports one of three
//! [`ArbitrationState`]s. A local button press re-runs the same election
//! against the most recent list and posts to the charge queue.
//!
//! - [`elect`]: the pure election function
//! - [`ArbitrationEngine`]: per-node inputs plus both triggers
//! - [`TelemetryBridge`] / [`Publisher`]: topic layout and the broker sink

pub mod election;
pub mod engine;
pub mod publisher;
pub mod telemetry;
pub mod token;

pub use election::{ArbitrationState, MatchRule, OccupancyList, elect};
pub use engine::{ArbitrationEngine, INITIAL_OCCUPANCY};
pub use publisher::{Publication, Publisher, RecordingPublisher};
pub use telemetry::{
    CHARGE_QUEUE_TOPIC, PublishOutcome, TelemetryBridge, WHOISHERE_TOPIC, charge_queue_payload,
    state_topic, telemetry_topic,
};
pub use token::{ChargerToken, DEFAULT_TOKEN};
