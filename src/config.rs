//! Configuration for AtlasDS backends
//!
//! Centralized configuration with sensible defaults. Every backend that
//! touches disk takes one of these; the memory backend needs none.

use std::path::PathBuf;

// =============================================================================
// Filesystem Backend
// =============================================================================

/// Default extension appended to every value file
pub const DEFAULT_EXTENSION: &str = ".data";

/// Options for [`FsDatastore`](crate::backend::FsDatastore)
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Create the root directory if it does not exist
    pub create_if_missing: bool,

    /// Fail the open if the root directory already exists
    pub error_if_exists: bool,

    /// Suffix of value files, including the leading dot
    pub extension: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl FsConfig {
    /// Create a new config builder
    pub fn builder() -> FsConfigBuilder {
        FsConfigBuilder::default()
    }
}

/// Builder for FsConfig
#[derive(Default)]
pub struct FsConfigBuilder {
    config: FsConfig,
}

impl FsConfigBuilder {
    pub fn create_if_missing(mut self, yes: bool) -> Self {
        self.config.create_if_missing = yes;
        self
    }

    pub fn error_if_exists(mut self, yes: bool) -> Self {
        self.config.error_if_exists = yes;
        self
    }

    /// Set the value file extension (a leading dot is added when missing)
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.config.extension = if ext.starts_with('.') {
            ext
        } else {
            format!(".{}", ext)
        };
        self
    }

    pub fn build(self) -> FsConfig {
        self.config
    }
}

// =============================================================================
// Sorted Engine Backend
// =============================================================================

/// Main configuration for an embedded engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all engine files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── sstables/        (SSTable files)
    pub data_dir: PathBuf,

    /// Create `data_dir` if it does not exist
    pub create_if_missing: bool,

    /// Fail the open if `data_dir` already holds an engine
    pub error_if_exists: bool,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Accepted, Not Applied
    // -------------------------------------------------------------------------
    /// Block cache size in bytes. The engine has no block cache; a value
    /// here is logged and otherwise ignored.
    pub cache_size: Option<usize>,

    /// Table compression. Tables are always written uncompressed; `true`
    /// is logged and otherwise ignored.
    pub compression: bool,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasds_data"),
            create_if_missing: true,
            error_if_exists: false,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 4 * 1024 * 1024, // 4 MB
            cache_size: None,
            compression: false,
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Options this engine accepts but does not implement
    pub fn ignored_options(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.cache_size.is_some() {
            ignored.push("cache_size");
        }
        if self.compression {
            ignored.push("compression");
        }
        ignored
    }
}

/// Builder for EngineConfig
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the data directory (root for all engine files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn create_if_missing(mut self, yes: bool) -> Self {
        self.config.create_if_missing = yes;
        self
    }

    pub fn error_if_exists(mut self, yes: bool) -> Self {
        self.config.error_if_exists = yes;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.config.cache_size = Some(bytes);
        self
    }

    pub fn compression(mut self, yes: bool) -> Self {
        self.config.compression = yes;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
