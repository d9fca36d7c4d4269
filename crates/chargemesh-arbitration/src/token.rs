//! Charger token derived from the node's network address

use std::fmt::{self, Display};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Token used before any address has been assigned
pub const DEFAULT_TOKEN: &str = "1";

/// The final dotted segment of a node's assigned address.
///
/// `10.0.0.7` yields `"7"`. The token is what a node looks for in the
/// occupancy list, so it changes whenever the address does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChargerToken(String);

impl ChargerToken {
    /// Token for an assigned IPv4 address
    pub fn from_ipv4(ip: Ipv4Addr) -> Self {
        Self(ip.octets()[3].to_string())
    }

    /// Token from a dotted address string: everything after the last `.`
    ///
    /// A string without any `.` is taken whole.
    pub fn from_address_str(address: &str) -> Self {
        let segment = address.rsplit('.').next().unwrap_or(address);
        Self(segment.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ChargerToken {
    fn default() -> Self {
        Self(DEFAULT_TOKEN.to_string())
    }
}

impl Display for ChargerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
