//! Storage Module
//!
//! Persistent layer of the sorted engine: immutable SSTables plus the
//! manager that tracks them and the cursor that merges them.
//!
//! ## Read Path
//! ```text
//!   memtable snapshot ─┐
//!   sstable N (newest) ─┼──► MergeCursor ──► live entries in key order
//!   ...                 │    (newest version wins, tombstones dropped)
//!   sstable 1 (oldest) ─┘
//! ```

mod cursor;
mod manager;
mod sstable;

pub use cursor::MergeCursor;
pub use manager::StorageManager;
pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader};
