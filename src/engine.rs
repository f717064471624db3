//! Engine Module
//!
//! The embedded sorted key-value engine behind
//! [`EngineDatastore`](crate::backend::EngineDatastore).
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Handle concurrent read/write access
//! - Trigger flushes when MemTable is full
//! - Manage crash recovery on startup
//! - Provide ordered cursors over every live key

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{AtlasError, Result};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::{MergeCursor, StorageManager};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The sorted storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/write_batch/flush): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → memtable → storage (write)
///
/// - **Reads** (get/cursor): No write_lock needed
///   - MemTable uses internal RwLock (many concurrent readers)
///   - StorageManager takes its read lock; each SSTable guards its own file
pub struct Engine {
    config: EngineConfig,

    /// Directory holding the SSTables
    storage_dir: PathBuf,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Serializes write operations
    write_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Engine {
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Check the directory against `create_if_missing` / `error_if_exists`
    /// 2. Load existing SSTables
    /// 3. Replay the WAL, flush what it held, then truncate it
    pub fn open(config: EngineConfig) -> Result<Self> {
        let data_dir = config.data_dir.clone();
        let wal_path = data_dir.join(Self::WAL_FILENAME);
        let storage_dir = data_dir.join(Self::SSTABLE_DIR);

        if data_dir.exists() {
            let holds_engine = wal_path.exists() || storage_dir.exists();
            if holds_engine && config.error_if_exists {
                return Err(AtlasError::Config(format!(
                    "Engine directory: {} already exists",
                    data_dir.display()
                )));
            }
        } else if !config.create_if_missing {
            return Err(AtlasError::Config(format!(
                "Engine directory: {} does not exist",
                data_dir.display()
            )));
        }

        let ignored = config.ignored_options();
        if !ignored.is_empty() {
            warn!(options = ?ignored, "Engine options accepted but not applied");
        }

        fs::create_dir_all(&storage_dir)?;
        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;
            if result.entries_recovered > 0 || result.was_truncated {
                info!(
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in entries {
                for op in entry.operations {
                    match op {
                        Operation::Put { key, value } => memtable.put(key, value),
                        Operation::Delete { key } => memtable.delete(key),
                    };
                }
            }

            // Recovered writes become durable in an SSTable before the WAL goes
            if !memtable.is_empty() {
                debug!(entries = memtable.entry_count(), "Flushing recovered entries");
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.truncate()?;

        info!(
            dir = %data_dir.display(),
            sstables = storage.sstable_count(),
            "Engine opened"
        );

        Ok(Self {
            config,
            storage_dir,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with default config rooted at `path`
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(EngineConfig::builder().data_dir(path).build())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(Some(value)),
                MemTableEntry::Tombstone => Ok(None),
            };
        }

        self.storage.get(key)
    }

    /// Put a key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_batch(vec![(key.to_vec(), value.to_vec())], Vec::new())
    }

    /// Delete a key (records a tombstone)
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write_batch(Vec::new(), vec![key.to_vec()])
    }

    /// Apply puts then deletes as a single WAL record
    ///
    /// After a crash the whole batch is replayed or none of it is.
    pub fn write_batch(&self, puts: Vec<(Vec<u8>, Vec<u8>)>, deletes: Vec<Vec<u8>>) -> Result<()> {
        if puts.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let _write_guard = self.write_lock.lock();
        self.ensure_open()?;

        let operations: Vec<Operation> = puts
            .iter()
            .map(|(key, value)| Operation::Put {
                key: key.clone(),
                value: value.clone(),
            })
            .chain(deletes.iter().map(|key| Operation::Delete { key: key.clone() }))
            .collect();

        // Step 1: WAL first (durability guarantee)
        self.wal.lock().append_batch(operations)?;

        // Step 2: MemTable
        let mut size = self.memtable.size();
        for (key, value) in puts {
            size = self.memtable.put(key, value);
        }
        for key in deletes {
            size = self.memtable.delete(key);
        }

        // Step 3: Flush when full
        if size >= self.config.memtable_size_limit {
            self.flush_internal()?;
        }

        Ok(())
    }

    /// Flush memtable to disk regardless of its size
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.ensure_open()?;
        self.flush_internal()
    }

    /// Called with the write lock held
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in the SSTable
        self.wal.lock().truncate()?;
        Ok(())
    }

    /// Ordered cursor over every live key
    ///
    /// The cursor reads a snapshot of the memtable plus the SSTables that
    /// existed when it was created. With `with_values == false` values are
    /// not read from disk and come back empty.
    pub fn cursor(&self, with_values: bool) -> Result<MergeCursor> {
        self.ensure_open()?;
        // Memtable before tables: a concurrent flush then shows up twice, never zero times
        let memtable = self.memtable.iter();
        let tables = self.storage.iterators(with_values)?;
        Ok(MergeCursor::new(memtable, tables))
    }

    /// Close the engine gracefully
    ///
    /// Flushes pending data and syncs the WAL. Closing twice is a no-op;
    /// every other operation fails with `AtlasError::Closed` afterwards.
    pub fn close(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.flush_internal()?;
        self.wal.lock().sync()?;
        self.closed.store(true, Ordering::SeqCst);

        info!(dir = %self.config.data_dir.display(), "Engine closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(AtlasError::Closed)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the storage directory path (where SSTables are stored)
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
