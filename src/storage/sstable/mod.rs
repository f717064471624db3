//! SSTable Module
//!
//! Immutable sorted tables written once by a memtable flush.
//!
//! ## Layout
//! ```text
//! offset 0          14                      index_offset            len-16     len
//!   │ header         │ data                  │ index                  │ footer  │
//!   │ "ATDS" ver cnt │ klen vlen key value … │ klen off key …         │ idx crc │
//! ```
//! - Header: magic (4), format version `u16`, entry count `u64`
//! - Data: `[key_len u32][val_len u32][key][value]` in ascending key order;
//!   `val_len == u32::MAX` marks a tombstone and carries no value bytes
//! - Index: `[key_len u32][data offset u64][key]` for every entry
//! - Footer: index offset `u64`, CRC32 of the data block, 4 zero bytes
//!
//! All integers are little-endian.

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

pub(crate) const MAGIC: &[u8; 4] = b"ATDS";
pub(crate) const VERSION: u16 = 1;

/// Magic (4) + version (2) + entry count (8)
pub(crate) const HEADER_SIZE: u64 = 14;

/// Index offset (8) + data CRC (4) + padding (4)
pub(crate) const FOOTER_SIZE: u64 = 16;

/// `val_len` of a deleted key
pub(crate) const TOMBSTONE_MARKER: u32 = u32::MAX;

/// Summary of a table the builder just published
#[derive(Debug, Clone)]
pub struct SSTable {
    pub path: PathBuf,
    pub entry_count: u64,
    /// Empty for a table without entries
    pub min_key: Vec<u8>,
    pub max_key: Vec<u8>,
    pub file_size: u64,
}

impl SSTable {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

pub(crate) fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

pub(crate) fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

pub(crate) fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
