//! Node addresses
//!
//! Every mesh node is identified on the wire by its 6-byte hardware address.
//! Addresses are immutable once assigned and display in the usual
//! colon-separated hex form.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Length of a node address on the wire
pub const ADDRESS_LEN: usize = 6;

/// 6-byte hardware address of a mesh node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress([u8; ADDRESS_LEN]);

impl NodeAddress {
    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Create an address from a slice, which must be exactly 6 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let array: [u8; ADDRESS_LEN] =
            bytes
                .try_into()
                .map_err(|_| IdentityError::InvalidLength {
                    expected: ADDRESS_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Short form for logging (last two bytes)
    pub fn short_id(&self) -> String {
        format!("{:02x}{:02x}", self.0[4], self.0[5])
    }
}

impl Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self)
    }
}

impl FromStr for NodeAddress {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != ADDRESS_LEN {
            return Err(IdentityError::InvalidFormat(s.to_string()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(IdentityError::InvalidFormat(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| IdentityError::InvalidFormat(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeAddress> for String {
    fn from(addr: NodeAddress) -> Self {
        addr.to_string()
    }
}

impl From<[u8; ADDRESS_LEN]> for NodeAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let addr = NodeAddress::new([0x24, 0x0a, 0xc4, 0x01, 0xbe, 0xef]);
        assert_eq!(addr.to_string(), "24:0a:c4:01:be:ef");

        let parsed: NodeAddress = "24:0a:c4:01:be:ef".parse().unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(addr.short_id(), "beef");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("24:0a:c4:01:be".parse::<NodeAddress>().is_err());
        assert!("24:0a:c4:01:be:zz".parse::<NodeAddress>().is_err());
        assert!("240a:c4:01:be:ef:00".parse::<NodeAddress>().is_err());
    }

    #[test]
    fn test_from_slice_length() {
        assert!(NodeAddress::from_slice(&[1, 2, 3, 4, 5, 6]).is_ok());
        assert!(matches!(
            NodeAddress::from_slice(&[1, 2, 3]),
            Err(IdentityError::InvalidLength {
                expected: 6,
                actual: 3
            })
        ));
    }
}
