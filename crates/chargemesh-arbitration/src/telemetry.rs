//! Broker topic layout and the bridge that publishes onto it
//!
//! ```text
//! <id>            A | B | C
//! <id>/RSSI       decimal dBm
//! <id>/LAYER      decimal depth
//! <id>/RTABLE     decimal routing table size
//! <id>/MESHMODE   ROOT | NODE
//! /WHOISHERE      "<MESHMODE> - <id>"
//! chargeQ         "<token> - 0" | "<token> - <token>"
//! ```
//!
//! `<id>` is the node's dotted IPv4 address.

use std::sync::Arc;

use tracing::{debug, warn};

use chargemesh_core::MeshStatus;

use crate::election::ArbitrationState;
use crate::publisher::Publisher;
use crate::token::ChargerToken;

/// Presence topic shared by every node
pub const WHOISHERE_TOPIC: &str = "/WHOISHERE";

/// Button-triggered charge queue topic
pub const CHARGE_QUEUE_TOPIC: &str = "chargeQ";

/// Topic carrying the node's arbitration state
pub fn state_topic(id: &str) -> String {
    id.to_string()
}

/// Topic for one telemetry field under the node's id
pub fn telemetry_topic(id: &str, field: &str) -> String {
    format!("{}/{}", id, field)
}

/// Payload for the charge queue topic
pub fn charge_queue_payload(token: &ChargerToken, state: ArbitrationState) -> String {
    if state.is_listed() {
        format!("{} - 0", token)
    } else {
        format!("{} - {}", token, token)
    }
}

/// Counts from one batch of publications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub published: usize,
    pub failed: usize,
}

impl PublishOutcome {
    fn record(&mut self, ok: bool) {
        if ok {
            self.published += 1;
        } else {
            self.failed += 1;
        }
    }

    fn merge(&mut self, other: PublishOutcome) {
        self.published += other.published;
        self.failed += other.failed;
    }
}

/// Publishes arbitration state and mesh telemetry to the broker.
///
/// Failures are logged and counted, never propagated.
#[derive(Clone)]
pub struct TelemetryBridge {
    publisher: Arc<dyn Publisher>,
}

impl TelemetryBridge {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    async fn send(&self, topic: &str, payload: &str) -> bool {
        match self.publisher.publish(topic, payload).await {
            Ok(()) => {
                debug!(topic, payload, "Published");
                true
            }
            Err(e) => {
                warn!(topic, error = %e, "Publish failed");
                false
            }
        }
    }

    /// Publish the state letter on `<id>`
    pub async fn publish_state(&self, id: &str, state: ArbitrationState) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        outcome.record(self.send(&state_topic(id), state.letter()).await);
        outcome
    }

    /// Publish RSSI, layer, table size, mode and presence
    pub async fn publish_status(&self, id: &str, status: &MeshStatus) -> PublishOutcome {
        let fields = [
            ("RSSI", status.rssi.to_string()),
            ("LAYER", status.layer.to_string()),
            ("RTABLE", status.routing_table_size.to_string()),
            ("MESHMODE", status.role.as_str().to_string()),
        ];

        let mut outcome = PublishOutcome::default();
        for (field, value) in &fields {
            outcome.record(self.send(&telemetry_topic(id, field), value).await);
        }

        let presence = format!("{} - {}", status.role, id);
        outcome.record(self.send(WHOISHERE_TOPIC, &presence).await);
        outcome
    }

    /// Telemetry followed by the state letter
    pub async fn publish_report(
        &self,
        id: &str,
        status: &MeshStatus,
        state: ArbitrationState,
    ) -> PublishOutcome {
        let mut outcome = self.publish_status(id, status).await;
        outcome.merge(self.publish_state(id, state).await);
        outcome
    }

    /// Publish the button-triggered queue entry
    pub async fn publish_charge_queue(
        &self,
        token: &ChargerToken,
        state: ArbitrationState,
    ) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        let payload = charge_queue_payload(token, state);
        outcome.record(self.send(CHARGE_QUEUE_TOPIC, &payload).await);
        outcome
    }
}
