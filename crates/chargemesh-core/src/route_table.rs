//! Bounded route table
//!
//! A [`RouteTable`] is the ordered list of node addresses the platform
//! reports for its mesh. Index 0 is the coordinating (root) node; the order
//! of the rest carries no meaning. The capacity is fixed when the table is
//! created and is never exceeded.

use crate::identity::NodeAddress;

/// Default capacity, matching the platform's route table size
pub const DEFAULT_ROUTE_TABLE_CAPACITY: usize = 50;

/// Ordered, capacity-bounded list of node addresses
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<NodeAddress>,
    capacity: usize,
}

impl RouteTable {
    /// Create an empty table with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a table from entries, keeping at most `capacity` of them.
    ///
    /// Returns the table and the number of entries that did not fit.
    pub fn from_entries(
        entries: impl IntoIterator<Item = NodeAddress>,
        capacity: usize,
    ) -> (Self, usize) {
        let mut table = Self::new(capacity);
        let mut dropped = 0;
        for entry in entries {
            if table.push(entry).is_err() {
                dropped += 1;
            }
        }
        (table, dropped)
    }

    /// Append an entry. Fails with the entry if the table is full.
    pub fn push(&mut self, addr: NodeAddress) -> Result<(), NodeAddress> {
        if self.entries.len() >= self.capacity {
            return Err(addr);
        }
        self.entries.push(addr);
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All entries in platform order
    pub fn entries(&self) -> &[NodeAddress] {
        &self.entries
    }

    /// The coordinating node, if the table is non-empty
    pub fn root(&self) -> Option<&NodeAddress> {
        self.entries.first()
    }

    /// Every entry except index 0
    pub fn forwarding_targets(&self) -> &[NodeAddress] {
        self.entries.get(1..).unwrap_or(&[])
    }

    /// Whether the address is listed
    pub fn contains(&self, addr: &NodeAddress) -> bool {
        self.entries.contains(addr)
    }

    /// Shorten the table to at most `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Change the capacity, dropping entries beyond it
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.entries.truncate(capacity);
        self.capacity = capacity;
        self
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_TABLE_CAPACITY)
    }
}

/// Tables are equal when they list the same addresses in the same order
impl PartialEq for RouteTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for RouteTable {}
