//! Wrappers
//!
//! Datastores that hold other datastores. Every wrapper implements the
//! same [`Datastore`](crate::Datastore) contract, so they nest freely:
//!
//! ```text
//!   TieredDatastore
//!     ├── MemoryDatastore            (tier 1, probed first)
//!     └── NamespaceDatastore("/blocks")
//!           └── FsDatastore          (tier 2, also serves queries)
//! ```

mod keytransform;
mod tiered;

pub use keytransform::{KeyTransform, KeyTransformDatastore, NamespaceDatastore, PrefixTransform};
pub use tiered::TieredDatastore;
