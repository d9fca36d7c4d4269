//! Configuration for a mesh node
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! dissemination_interval_ms = 5000
//! match_rule = "exact"
//!
//! [mesh]
//! mesh_id = "77:77:77:77:77:76"
//! max_layer = 4
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chargemesh_arbitration::MatchRule;
use chargemesh_core::{DEFAULT_ROUTE_TABLE_CAPACITY, NodeAddress};
use chargemesh_routing::{DEFAULT_LOCK_TIMEOUT, DisseminationConfig};

use crate::error::ConfigError;

/// Parameters handed to the platform mesh stack when it is brought up.
///
/// The node itself never reads `mesh_id` or `channel`; they pass through to
/// the radio. `max_layer` and `ap_connections` also bound the tree the
/// simulator builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Identifier shared by every node of one mesh
    pub mesh_id: NodeAddress,
    /// Radio channel, 0 for automatic
    pub channel: u8,
    /// Deepest layer a node may join at
    pub max_layer: u8,
    /// Children each node accepts
    pub ap_connections: u8,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_id: NodeAddress::new([0x77, 0x77, 0x77, 0x77, 0x77, 0x76]),
            channel: 0,
            max_layer: 6,
            ap_connections: 6,
        }
    }
}

/// Configuration for a [`MeshNode`](crate::MeshNode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Maximum route table entries held and sent
    pub route_table_capacity: usize,
    /// Time between route table broadcasts
    pub dissemination_interval_ms: u64,
    /// Upper bound on a single mesh send
    pub send_timeout_ms: u64,
    /// Upper bound on waiting for the route table cache lock
    pub lock_timeout_ms: u64,
    /// How a token is matched against occupancy entries
    pub match_rule: MatchRule,
    /// Capacity of the trigger and keypress channels
    pub channel_capacity: usize,
    /// Send a KEYPRESS frame to the root when the local button is pressed
    pub announce_keypress: bool,
    /// Platform mesh parameters
    pub mesh: MeshSettings,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            route_table_capacity: DEFAULT_ROUTE_TABLE_CAPACITY,
            dissemination_interval_ms: 2_000,
            send_timeout_ms: 1_000,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            match_rule: MatchRule::default(),
            channel_capacity: 64,
            announce_keypress: true,
            mesh: MeshSettings::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the node cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.route_table_capacity == 0 {
            return Err(ConfigError::Invalid(
                "route_table_capacity must be at least 1".into(),
            ));
        }
        if self.dissemination_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dissemination_interval_ms must be positive".into(),
            ));
        }
        if self.send_timeout_ms == 0 || self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be at least 1".into()));
        }
        if self.mesh.max_layer == 0 {
            return Err(ConfigError::Invalid("mesh.max_layer must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_route_table_capacity(mut self, capacity: usize) -> Self {
        self.route_table_capacity = capacity;
        self
    }

    pub fn with_dissemination_interval(mut self, interval: Duration) -> Self {
        self.dissemination_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_match_rule(mut self, rule: MatchRule) -> Self {
        self.match_rule = rule;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_announce_keypress(mut self, enabled: bool) -> Self {
        self.announce_keypress = enabled;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshSettings) -> Self {
        self.mesh = mesh;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Settings for the dissemination loop
    pub fn dissemination(&self) -> DisseminationConfig {
        DisseminationConfig {
            interval: Duration::from_millis(self.dissemination_interval_ms),
            send_timeout: self.send_timeout(),
            capacity: self.route_table_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.route_table_capacity, 50);
        assert_eq!(config.dissemination().interval, Duration::from_secs(2));
        assert_eq!(config.send_timeout(), Duration::from_secs(1));
        assert_eq!(config.match_rule, MatchRule::LeadingChar);
        assert!(config.announce_keypress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = NodeConfig::from_toml_str(
            r#"
            dissemination_interval_ms = 5000
            match_rule = "exact"

            [mesh]
            mesh_id = "01:02:03:04:05:06"
            max_layer = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.dissemination_interval_ms, 5000);
        assert_eq!(config.match_rule, MatchRule::Exact);
        assert_eq!(config.mesh.mesh_id.to_string(), "01:02:03:04:05:06");
        assert_eq!(config.mesh.max_layer, 4);
        assert_eq!(config.mesh.ap_connections, 6);
        assert_eq!(config.route_table_capacity, 50);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = NodeConfig::from_toml_str("route_table_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = NodeConfig::from_toml_str("match_rule = \"fuzzy\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));

        let err = NodeConfig::from_toml_str("[mesh]\nmesh_id = \"nope\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = NodeConfig::default()
            .with_match_rule(MatchRule::Substring)
            .with_dissemination_interval(Duration::from_millis(250));
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("match_rule = \"substring\""));
        assert_eq!(NodeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_builders() {
        let config = NodeConfig::default()
            .with_route_table_capacity(8)
            .with_send_timeout(Duration::from_millis(50))
            .with_lock_timeout(Duration::from_millis(5))
            .with_channel_capacity(4)
            .with_announce_keypress(false);
        let d = config.dissemination();
        assert_eq!(d.capacity, 8);
        assert_eq!(d.send_timeout, Duration::from_millis(50));
        assert_eq!(config.lock_timeout(), Duration::from_millis(5));
        assert!(!config.announce_keypress);
    }
}
