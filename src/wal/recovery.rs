//! WAL Recovery
//!
//! Replays the WAL after a restart and drops a torn or corrupt tail.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::warn;

use crate::error::{AtlasError, Result};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN (0 when nothing was recovered)
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid records in order
    /// 2. Stop at the first torn or corrupt record
    /// 3. Truncate the file to the last good record
    ///
    /// Nothing after a bad record is trusted: its length field may itself
    /// be damaged, so there is no reliable way to resynchronize.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, good_len) = Self::scan(path)?;

        if result.was_truncated {
            warn!(
                path = %path.display(),
                good_len,
                last_lsn = result.last_lsn,
                "Truncating WAL after corrupt or partial record"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(good_len)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(AtlasError::WalCorruption(reason)) => {
                    warn!(path = %path.display(), %reason, "WAL corruption detected");
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
                Err(AtlasError::Serialization(reason)) => {
                    warn!(path = %path.display(), %reason, "Undecodable WAL record");
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((entries, result, reader.position()))
    }
}
