//! # Mesh Wire Format
//!
//! Frames exchanged between nodes over the mesh transport. One tag byte
//! followed by a command-specific payload:
//!
//! ```text
//! ROUTE_TABLE  [0x56][addr:6] * N      N <= route table capacity
//! KEYPRESS     [0x55][addr:6]          total length exactly 7
//! ```
//!
//! There is no checksum or length prefix; integrity is left to the mesh
//! transport and the frame length is the transport's datagram length.
//!
//! ## Oversized route tables
//!
//! A ROUTE_TABLE frame listing more addresses than the receiver's capacity
//! is not rejected. The table is truncated to the first `capacity` entries
//! and a warning is logged.

use tracing::warn;

use crate::error::FrameError;
use crate::identity::{ADDRESS_LEN, NodeAddress};
use crate::route_table::RouteTable;

/// Total length of a KEYPRESS frame: tag + one address
pub const KEYPRESS_FRAME_LEN: usize = 1 + ADDRESS_LEN;

/// Command tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandTag {
    /// A button was pressed on the node named in the payload
    Keypress = 0x55,
    /// Snapshot of the sender's route table
    RouteTable = 0x56,
}

impl CommandTag {
    /// Name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keypress => "KEYPRESS",
            Self::RouteTable => "ROUTE_TABLE",
        }
    }
}

impl TryFrom<u8> for CommandTag {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x55 => Ok(Self::Keypress),
            0x56 => Ok(Self::RouteTable),
            _ => Err(FrameError::UnknownCommand(value)),
        }
    }
}

/// A decoded mesh command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshFrame {
    /// Route table snapshot, root first
    RouteTable(RouteTable),
    /// Keypress notification carrying the originating node's address
    Keypress(NodeAddress),
}

impl MeshFrame {
    /// Tag of this frame
    pub fn tag(&self) -> CommandTag {
        match self {
            Self::RouteTable(_) => CommandTag::RouteTable,
            Self::Keypress(_) => CommandTag::Keypress,
        }
    }

    /// Encode to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());
        buf.push(self.tag() as u8);

        match self {
            Self::RouteTable(table) => {
                for entry in table.entries() {
                    buf.extend_from_slice(entry.as_bytes());
                }
            }
            Self::Keypress(origin) => buf.extend_from_slice(origin.as_bytes()),
        }

        buf
    }

    /// Decode from bytes.
    ///
    /// `capacity` bounds the number of route table entries kept.
    pub fn decode(data: &[u8], capacity: usize) -> Result<Self, FrameError> {
        let Some((&tag_byte, payload)) = data.split_first() else {
            return Err(FrameError::MalformedSize {
                command: "EMPTY",
                len: 0,
            });
        };

        match CommandTag::try_from(tag_byte)? {
            CommandTag::RouteTable => {
                if payload.len() % ADDRESS_LEN != 0 {
                    return Err(FrameError::MalformedSize {
                        command: CommandTag::RouteTable.name(),
                        len: data.len(),
                    });
                }

                let entries = payload
                    .chunks_exact(ADDRESS_LEN)
                    .filter_map(|chunk| NodeAddress::from_slice(chunk).ok());
                let (table, dropped) = RouteTable::from_entries(entries, capacity);

                if dropped > 0 {
                    warn!(
                        received = table.len() + dropped,
                        capacity, dropped, "Route table exceeds capacity, truncated"
                    );
                }

                Ok(Self::RouteTable(table))
            }
            CommandTag::Keypress => {
                if data.len() != KEYPRESS_FRAME_LEN {
                    return Err(FrameError::MalformedSize {
                        command: CommandTag::Keypress.name(),
                        len: data.len(),
                    });
                }
                let origin =
                    NodeAddress::from_slice(payload).map_err(|_| FrameError::MalformedSize {
                        command: CommandTag::Keypress.name(),
                        len: data.len(),
                    })?;
                Ok(Self::Keypress(origin))
            }
        }
    }

    /// Get encoded size without actually encoding
    pub fn encoded_size(&self) -> usize {
        1 + match self {
            Self::RouteTable(table) => table.len() * ADDRESS_LEN,
            Self::Keypress(_) => ADDRESS_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> NodeAddress {
        NodeAddress::new([0x24, 0x0a, 0xc4, 0x00, 0x00, n])
    }

    fn table(n: u8, capacity: usize) -> RouteTable {
        RouteTable::from_entries((1..=n).map(addr), capacity).0
    }

    #[test]
    fn test_route_table_wire_layout() {
        let frame = MeshFrame::RouteTable(table(2, 10));
        let encoded = frame.encode();

        assert_eq!(encoded.len(), 13);
        assert_eq!(encoded[0], 0x56);
        assert_eq!(&encoded[1..7], addr(1).as_bytes());
        assert_eq!(&encoded[7..13], addr(2).as_bytes());
        assert_eq!(frame.encoded_size(), encoded.len());
    }

    #[test]
    fn test_route_table_roundtrip_every_size() {
        let capacity = 8;
        for k in 0..=capacity as u8 {
            let original = table(k, capacity);
            let encoded = MeshFrame::RouteTable(original.clone()).encode();
            let decoded = MeshFrame::decode(&encoded, capacity).unwrap();
            assert_eq!(decoded, MeshFrame::RouteTable(original));
        }
    }

    #[test]
    fn test_empty_route_table_is_single_byte() {
        let encoded = MeshFrame::RouteTable(RouteTable::new(4)).encode();
        assert_eq!(encoded, vec![0x56]);

        match MeshFrame::decode(&encoded, 4).unwrap() {
            MeshFrame::RouteTable(t) => assert!(t.is_empty()),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_route_table_malformed_size() {
        for extra in 1..ADDRESS_LEN {
            let mut buf = MeshFrame::RouteTable(table(2, 10)).encode();
            buf.extend(std::iter::repeat_n(0xAA, extra));
            assert!(matches!(
                MeshFrame::decode(&buf, 10),
                Err(FrameError::MalformedSize {
                    command: "ROUTE_TABLE",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_route_table_truncated_to_capacity() {
        let encoded = MeshFrame::RouteTable(table(6, 10)).encode();
        let decoded = MeshFrame::decode(&encoded, 4).unwrap();

        match decoded {
            MeshFrame::RouteTable(t) => {
                assert_eq!(t.len(), 4);
                assert_eq!(t.capacity(), 4);
                assert_eq!(t.entries(), &[addr(1), addr(2), addr(3), addr(4)]);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_keypress_roundtrip() {
        let frame = MeshFrame::Keypress(addr(9));
        let encoded = frame.encode();
        assert_eq!(encoded.len(), KEYPRESS_FRAME_LEN);
        assert_eq!(encoded[0], 0x55);
        assert_eq!(MeshFrame::decode(&encoded, 10).unwrap(), frame);
    }

    #[test]
    fn test_keypress_wrong_length() {
        let short = vec![0x55, 1, 2, 3, 4, 5];
        let long = vec![0x55, 1, 2, 3, 4, 5, 6, 7];
        let doubled = vec![0x55, 1, 2, 3, 4, 5, 6, 1, 2, 3, 4, 5, 6];

        for buf in [short, long, doubled] {
            assert!(matches!(
                MeshFrame::decode(&buf, 10),
                Err(FrameError::MalformedSize {
                    command: "KEYPRESS",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_unknown_command() {
        for tag in [0x00u8, 0x54, 0x57, 0xFF] {
            assert_eq!(
                MeshFrame::decode(&[tag, 1, 2, 3, 4, 5, 6], 10),
                Err(FrameError::UnknownCommand(tag))
            );
        }
    }

    #[test]
    fn test_empty_buffer() {
        assert!(matches!(
            MeshFrame::decode(&[], 10),
            Err(FrameError::MalformedSize { len: 0, .. })
        ));
    }
}
