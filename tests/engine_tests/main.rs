//! Tests for the sorted engine and its building blocks
//!
//! - engine: put/get/delete, batches, flush, recovery, lifecycle
//! - cursor: merged ordered scans across memtable and SSTables
//! - wal: record framing, writer, recovery
//! - sstable: builder, reader, iterator, storage manager
//! - memtable: size accounting and snapshots

mod cursor;
