//! # AtlasDS
//!
//! One async key-value contract, several interchangeable stores:
//! - In-memory, filesystem (one file per key) and an embedded sorted
//!   engine (WAL + memtable + SSTables)
//! - Wrappers that nest any store: key transforms, tiers, sharding
//! - One query pipeline shared by every store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                               │
//! │                 (any impl Datastore)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Wrappers                               │
//! │    Sharding ─► KeyTransform        Tiered (fan-out)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │   Memory    │ │ Filesystem  │ │   Engine    │
//!   │  (RwLock)   │ │ (tokio::fs) │ │ (WAL + SST) │
//!   └──────┬──────┘ └──────┬──────┘ └──────┬──────┘
//!          └───────────────┼───────────────┘
//!                          ▼
//!                 ┌─────────────────┐
//!                 │ Query pipeline  │
//!                 │ prefix ► filter │
//!                 │ ► order ► page  │
//!                 └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod key;

pub mod datastore;
pub mod query;

pub mod backend;
pub mod sharding;
pub mod wrapper;

pub mod engine;
pub mod memtable;
pub mod storage;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{EngineDatastore, FsDatastore, MemoryDatastore};
pub use config::{EngineConfig, FsConfig, WalSyncStrategy};
pub use datastore::{Batch, Datastore};
pub use engine::Engine;
pub use error::{AtlasError, Result};
pub use key::Key;
pub use query::{Entry, Filter, Order, Query, QueryStream};
pub use sharding::{ShardFn, ShardingDatastore};
pub use wrapper::{KeyTransform, KeyTransformDatastore, NamespaceDatastore, TieredDatastore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasDS
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
