//! MemTable Module
//!
//! In-memory write buffer of the sorted engine.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Track approximate size for flush triggers
//! - Sorted snapshots for SSTable flushes and engine cursors
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock: keys stay ordered, which both the flush
//! path and the merging cursor rely on.

mod table;

pub use table::{MemTable, MemTableIterator};

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// Bytes accounted against the memtable size limit
    pub(crate) fn footprint(&self) -> usize {
        match self {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        }
    }
}
