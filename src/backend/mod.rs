//! Backends
//!
//! Leaf stores that actually hold data:
//! - [`MemoryDatastore`]: hash map, nothing persisted
//! - [`FsDatastore`]: one file per key under a root directory
//! - [`EngineDatastore`]: the embedded sorted engine (WAL + SSTables)

mod engine;
mod fs;
mod memory;

pub use engine::EngineDatastore;
pub use fs::FsDatastore;
pub use memory::MemoryDatastore;
