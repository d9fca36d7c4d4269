//! Arbitration engine
//!
//! Owns the node's arbitration inputs (its address and token, the latest
//! occupancy list) and runs the election for both triggers:
//!
//! - **broker**: a new occupancy list arrives; the list is stored, telemetry
//!   is published, then the state letter on `<id>`.
//! - **button**: the stored list is re-evaluated and the result goes to
//!   `chargeQ`.
//!
//! Inputs are copied out of their locks before anything is published, so no
//! lock is ever held across an await.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use chargemesh_core::MeshLayer;

use crate::election::{ArbitrationState, MatchRule, OccupancyList, elect};
use crate::publisher::Publisher;
use crate::telemetry::{PublishOutcome, TelemetryBridge};
use crate::token::ChargerToken;

/// Occupancy list assumed before the broker has sent one
pub const INITIAL_OCCUPANCY: &str = "0";

/// Id used in topics before an address is assigned
const UNASSIGNED_ID: &str = "0.0.0.0";

#[derive(Debug, Clone, Default)]
struct Identity {
    ip: Option<Ipv4Addr>,
    token: ChargerToken,
}

/// Election state and broker output for one node
pub struct ArbitrationEngine {
    bridge: TelemetryBridge,
    mesh: Arc<dyn MeshLayer>,
    rule: MatchRule,
    identity: RwLock<Identity>,
    occupancy: Mutex<OccupancyList>,
    state: Mutex<ArbitrationState>,
}

impl ArbitrationEngine {
    pub fn new(publisher: Arc<dyn Publisher>, mesh: Arc<dyn MeshLayer>, rule: MatchRule) -> Self {
        Self {
            bridge: TelemetryBridge::new(publisher),
            mesh,
            rule,
            identity: RwLock::new(Identity::default()),
            occupancy: Mutex::new(OccupancyList::parse(INITIAL_OCCUPANCY)),
            state: Mutex::new(ArbitrationState::Unlisted),
        }
    }

    /// Record a newly assigned address and recompute the token.
    ///
    /// Returns true if the address changed.
    pub fn set_address(&self, ip: Ipv4Addr) -> bool {
        let mut identity = self.identity.write();
        if identity.ip == Some(ip) {
            return false;
        }

        let token = ChargerToken::from_ipv4(ip);
        info!(ip = %ip, old_token = %identity.token, new_token = %token, "Charger token updated");
        identity.ip = Some(ip);
        identity.token = token;
        true
    }

    /// Assigned address, if any
    pub fn address(&self) -> Option<Ipv4Addr> {
        self.identity.read().ip
    }

    /// Topic id: the dotted address
    pub fn id(&self) -> String {
        self.identity
            .read()
            .ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNASSIGNED_ID.to_string())
    }

    pub fn token(&self) -> ChargerToken {
        self.identity.read().token.clone()
    }

    pub fn rule(&self) -> MatchRule {
        self.rule
    }

    /// Last state published on `<id>`
    pub fn state(&self) -> ArbitrationState {
        *self.state.lock()
    }

    /// Most recent occupancy list from the broker
    pub fn occupancy(&self) -> OccupancyList {
        self.occupancy.lock().clone()
    }

    /// Startup publication: telemetry and the initial `C`
    pub async fn announce(&self) -> PublishOutcome {
        let state = ArbitrationState::Unlisted;
        *self.state.lock() = state;

        let id = self.id();
        info!(id = %id, "Announcing node to broker");
        self.bridge
            .publish_report(&id, &self.mesh.status(), state)
            .await
    }

    /// Broker trigger: store `raw`, elect, publish telemetry then the state
    pub async fn on_occupancy(&self, raw: &str) -> ArbitrationState {
        let list = OccupancyList::parse(raw);
        *self.occupancy.lock() = list.clone();

        let (id, token) = {
            let identity = self.identity.read();
            let id = identity
                .ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| UNASSIGNED_ID.to_string());
            (id, identity.token.clone())
        };

        let state = elect(&list, &token, self.rule);
        *self.state.lock() = state;
        debug!(list = %list, token = %token, state = %state, "Occupancy evaluated");

        self.bridge
            .publish_report(&id, &self.mesh.status(), state)
            .await;
        state
    }

    /// Button trigger: re-evaluate the stored list and publish to `chargeQ`
    pub async fn on_button(&self) -> ArbitrationState {
        let list = self.occupancy();
        let token = self.token();

        let state = elect(&list, &token, self.rule);
        info!(list = %list, token = %token, state = %state, "Button pressed");

        self.bridge.publish_charge_queue(&token, state).await;
        state
    }
}
