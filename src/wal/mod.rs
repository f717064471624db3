//! Write-Ahead Log (WAL) Module
//!
//! Durability for the sorted engine: every write batch is appended here
//! before it touches the memtable, and replayed on the next open.
//!
//! ## Record Layout
//! ```text
//! ┌─────────┬─────────┬─────────┬──────────────────────────────┐
//! │ LSN u64 │ CRC u32 │ Len u32 │ bincode(ops, timestamp)      │
//! └─────────┴─────────┴─────────┴──────────────────────────────┘
//! ```
//! The CRC covers the LSN and the encoded body. One record holds one whole
//! batch, so recovery replays a batch entirely or not at all. The log is
//! truncated once the memtable it protects is durable in an SSTable.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
