//! WAL Entry definitions
//!
//! Defines the structure and framing of individual WAL records.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

/// Record header: LSN (8) + CRC (4) + data length (4)
pub const HEADER_SIZE: usize = 16;

/// A single record in the WAL
///
/// A record holds every operation of one engine write. Replay applies a
/// record entirely or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operations to apply, in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when the record was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Serialized body of a record
#[derive(Serialize, Deserialize)]
struct Payload {
    operations: Vec<Operation>,
    timestamp: u64,
}

impl WalEntry {
    /// Create a record stamped with the current time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Frame the record: header followed by the bincode payload
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&Payload {
            operations: self.operations.clone(),
            timestamp: self.timestamp,
        })?;

        let len = u32::try_from(payload.len()).map_err(|_| {
            AtlasError::Serialization(format!("WAL record too large: {} bytes", payload.len()))
        })?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(&self.lsn.to_le_bytes());
        buf.extend_from_slice(&compute_crc(self.lsn, &payload).to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Parse one framed record from the start of `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;
        let end = HEADER_SIZE + header.len;
        if bytes.len() < end {
            return Err(AtlasError::WalCorruption(format!(
                "Truncated record at LSN {}: need {} bytes, have {}",
                header.lsn,
                end,
                bytes.len()
            )));
        }
        Self::from_parts(&header, &bytes[HEADER_SIZE..end])
    }

    /// Build a record from a parsed header and its payload, checking the CRC
    pub(crate) fn from_parts(header: &Header, payload: &[u8]) -> Result<Self> {
        let actual = compute_crc(header.lsn, payload);
        if actual != header.crc {
            return Err(AtlasError::WalCorruption(format!(
                "CRC mismatch at LSN {}: expected {:08x}, computed {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let Payload {
            operations,
            timestamp,
        } = bincode::deserialize(payload)?;

        Ok(Self {
            lsn: header.lsn,
            operations,
            timestamp,
        })
    }

    /// Size of the framed record in bytes
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(self.serialize()?.len())
    }
}

/// Decoded record header
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub lsn: u64,
    pub crc: u32,
    pub len: usize,
}

impl Header {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(AtlasError::WalCorruption(format!(
                "Header too small: {} bytes",
                bytes.len()
            )));
        }
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);

        Ok(Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len) as usize,
        })
    }
}

/// CRC32 over the LSN bytes and the payload
fn compute_crc(lsn: u64, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}
