//! Error types for AtlasDS
//!
//! Provides a unified error type for every store, wrapper and the engine.

use thiserror::Error;

use crate::key::Key;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Unified error type for AtlasDS operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Datastore Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {key}")]
    NotFound { key: Key },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Datastore is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    /// A user-supplied filter or order stage failed
    #[error("Query stage failed: {0}")]
    Stage(String),

    // -------------------------------------------------------------------------
    // Sharding Errors
    // -------------------------------------------------------------------------
    #[error("Datastore is already sharded")]
    AlreadySharded,

    #[error("Datastore is not sharded: missing shard descriptor")]
    NotSharded,

    #[error("Shard function mismatch: expected {expected}, found {found}")]
    ShardMismatch { expected: String, found: String },

    #[error("Invalid shard descriptor: {0}")]
    InvalidShardDescriptor(String),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AtlasError {
    /// Build a `NotFound` error for `key`
    pub fn not_found(key: &Key) -> Self {
        AtlasError::NotFound { key: key.clone() }
    }

    /// Build a `Stage` error from anything displayable
    pub fn stage(msg: impl std::fmt::Display) -> Self {
        AtlasError::Stage(msg.to_string())
    }

    /// True for a get/has miss on an absent key
    pub fn is_not_found(&self) -> bool {
        matches!(self, AtlasError::NotFound { .. })
    }

    /// True for any sharding-protocol precondition violation
    pub fn is_sharding(&self) -> bool {
        matches!(
            self,
            AtlasError::AlreadySharded
                | AtlasError::NotSharded
                | AtlasError::ShardMismatch { .. }
                | AtlasError::InvalidShardDescriptor(_)
        )
    }
}

impl From<bincode::Error> for AtlasError {
    fn from(e: bincode::Error) -> Self {
        AtlasError::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AtlasError {
    fn from(e: tokio::task::JoinError) -> Self {
        AtlasError::Storage(format!("Blocking task failed: {}", e))
    }
}
