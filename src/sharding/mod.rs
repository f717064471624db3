//! Sharding Protocol
//!
//! Spreads a flat key space over a bounded set of subdirectories and
//! records the placement rule inside the store itself.
//!
//! ## Layout
//! ```text
//! {store}/
//!   ├── SHARDING        "/repo/flatfs/shard/v1/next-to-last/2\n"
//!   ├── _README         human-readable description
//!   ├── ll/
//!   │   └── hello       (key /hello)
//!   └── or/
//!       └── world       (key /world)
//! ```
//!
//! ## Lifecycle
//! ```text
//!   Unsharded ──create──► Descriptor written ──open(matching)──► Active
//!       │                        │
//!     open ──► NotSharded      open(other fn) ──► ShardMismatch
//! ```
//! The descriptor is written once. Re-sharding an existing store is not
//! supported.

mod shard;

use bytes::Bytes;
use tracing::{debug, info};

use crate::datastore::Datastore;
use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::wrapper::KeyTransformDatastore;

pub use shard::{parse_shard_fn, ShardFn, ShardTransform, SHARD_PREFIX, SHARD_VERSION};

/// Reserved key holding the shard descriptor
pub const SHARDING_FN: &str = "/SHARDING";

/// Reserved key holding the README
pub const README_FN: &str = "/_README";

/// Fixed content of the README entry
pub const README: &str = "This is a repository of key-value data, sharded by directory.

Each key lives in a subdirectory named after a few characters of the key.
The exact rule is recorded in the SHARDING file next to this one, for
example:

    /repo/flatfs/shard/v1/next-to-last/2

reads as: take the key without separators, skip its last character, and
use the two characters before it as the directory name. The key /hello is
therefore stored at ll/hello. Keys shorter than the rule needs are padded
on the left with underscores.

Do not edit SHARDING. Opening this store with a different rule is refused.
";

/// A store seen through its persisted shard function
pub type ShardingDatastore<D> = KeyTransformDatastore<D, ShardTransform>;

/// True for the descriptor and README keys
pub fn is_reserved(key: &Key) -> bool {
    key.as_str() == SHARDING_FN || key.as_str() == README_FN
}

/// Write the descriptor and README into an unsharded store
///
/// Both are written through `store` directly, never through a sharded
/// view. Fails with `AlreadySharded` if a descriptor exists.
pub async fn create<D>(store: &D, shard: &ShardFn) -> Result<()>
where
    D: Datastore + ?Sized,
{
    let descriptor_key = Key::new(SHARDING_FN);
    if store.has(&descriptor_key).await? {
        return Err(AtlasError::AlreadySharded);
    }

    store
        .put(&descriptor_key, Bytes::from(format!("{}\n", shard)))
        .await?;
    store
        .put(&Key::new(README_FN), Bytes::from_static(README.as_bytes()))
        .await?;

    info!(shard = %shard, "Created sharded store");
    Ok(())
}

/// Read the persisted shard function
pub async fn read_shard_fn<D>(store: &D) -> Result<ShardFn>
where
    D: Datastore + ?Sized,
{
    let raw = match store.get(&Key::new(SHARDING_FN)).await {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => return Err(AtlasError::NotSharded),
        Err(e) => return Err(e),
    };
    let text = std::str::from_utf8(&raw)
        .map_err(|e| AtlasError::InvalidShardDescriptor(format!("not UTF-8: {}", e)))?;
    parse_shard_fn(text)
}

/// Open a sharded view of `store`
///
/// With `expected` set, the persisted function must have the same string
/// form or the open fails with `ShardMismatch`.
pub async fn open<D: Datastore>(store: D, expected: Option<&ShardFn>) -> Result<ShardingDatastore<D>> {
    let found = read_shard_fn(&store).await?;

    if let Some(expected) = expected {
        let (want, have) = (expected.to_string(), found.to_string());
        if want != have {
            return Err(AtlasError::ShardMismatch {
                expected: want,
                found: have,
            });
        }
    }

    debug!(shard = %found, "Opened sharded store");
    Ok(KeyTransformDatastore::new(store, ShardTransform::new(found)))
}

/// Create the descriptor if missing, then open with `shard` as expectation
///
/// Only `AlreadySharded` falls through to the open; any other create
/// failure is returned as-is.
pub async fn create_or_open<D: Datastore>(store: D, shard: &ShardFn) -> Result<ShardingDatastore<D>> {
    match create(&store, shard).await {
        Ok(()) | Err(AtlasError::AlreadySharded) => open(store, Some(shard)).await,
        Err(e) => Err(e),
    }
}
