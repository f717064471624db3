//! Tests for the sharding protocol
//!
//! These tests verify:
//! - Descriptor and README creation
//! - Open preconditions (NotSharded, ShardMismatch, AlreadySharded)
//! - Key placement below shard directories
//! - Reserved keys staying out of the sharded view

use std::sync::Arc;

use atlasds::query::OrderByKey;
use atlasds::sharding::{self, README, README_FN, SHARDING_FN};
use atlasds::wrapper::KeyTransform;
use atlasds::{AtlasError, Datastore, FsDatastore, Key, MemoryDatastore, Query, ShardFn};
use bytes::Bytes;
use futures::TryStreamExt;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

async fn sorted_keys(store: &dyn Datastore) -> Vec<String> {
    store
        .query(Query::new().order(Arc::new(OrderByKey)).keys_only(true))
        .map_ok(|e| e.key.to_string())
        .try_collect()
        .await
        .unwrap()
}

// =============================================================================
// Create / Open Tests
// =============================================================================

#[tokio::test]
async fn test_create_writes_descriptor_and_readme() {
    let store = MemoryDatastore::new();

    sharding::create(&store, &ShardFn::NextToLast(2)).await.unwrap();

    let descriptor = store.get(&Key::new(SHARDING_FN)).await.unwrap();
    assert_eq!(descriptor, Bytes::from_static(b"/repo/flatfs/shard/v1/next-to-last/2\n"));

    let readme = store.get(&Key::new(README_FN)).await.unwrap();
    assert_eq!(readme, Bytes::from_static(README.as_bytes()));
}

#[tokio::test]
async fn test_create_twice_fails() {
    let store = MemoryDatastore::new();
    sharding::create(&store, &ShardFn::Prefix(2)).await.unwrap();

    let err = sharding::create(&store, &ShardFn::Prefix(2)).await.unwrap_err();

    assert!(matches!(err, AtlasError::AlreadySharded));
}

#[tokio::test]
async fn test_open_unsharded_store_fails() {
    let err = sharding::open(MemoryDatastore::new(), None).await.unwrap_err();

    assert!(matches!(err, AtlasError::NotSharded));
    assert!(err.is_sharding());
}

#[tokio::test]
async fn test_open_with_different_function_fails() {
    let store = Arc::new(MemoryDatastore::new());
    sharding::create(&store, &ShardFn::NextToLast(2)).await.unwrap();

    let err = sharding::open(store.clone(), Some(&ShardFn::NextToLast(3)))
        .await
        .unwrap_err();

    match err {
        AtlasError::ShardMismatch { expected, found } => {
            assert_eq!(expected, "/repo/flatfs/shard/v1/next-to-last/3");
            assert_eq!(found, "/repo/flatfs/shard/v1/next-to-last/2");
        }
        other => panic!("unexpected error: {other}"),
    }

    sharding::open(store, Some(&ShardFn::NextToLast(2))).await.unwrap();
}

#[tokio::test]
async fn test_open_without_expectation_uses_persisted_function() {
    let store = Arc::new(MemoryDatastore::new());
    sharding::create(&store, &ShardFn::Suffix(3)).await.unwrap();

    let sharded = sharding::open(store, None).await.unwrap();

    assert_eq!(*sharded.transform().shard_fn(), ShardFn::Suffix(3));
}

#[tokio::test]
async fn test_open_with_garbage_descriptor_fails() {
    let store = Arc::new(MemoryDatastore::new());
    store
        .put(&Key::new(SHARDING_FN), Bytes::from_static(b"/repo/flatfs/shard/v1/middle/2\n"))
        .await
        .unwrap();

    let err = sharding::open(store, None).await.unwrap_err();

    assert!(matches!(err, AtlasError::InvalidShardDescriptor(_)));
}

#[tokio::test]
async fn test_read_shard_fn_accepts_short_form() {
    let store = MemoryDatastore::new();
    store
        .put(&Key::new(SHARDING_FN), Bytes::from_static(b"  prefix/4 \n"))
        .await
        .unwrap();

    assert_eq!(sharding::read_shard_fn(&store).await.unwrap(), ShardFn::Prefix(4));
}

#[tokio::test]
async fn test_create_or_open() {
    let store = Arc::new(MemoryDatastore::new());

    sharding::create_or_open(store.clone(), &ShardFn::NextToLast(2))
        .await
        .unwrap();
    // Second call finds the descriptor and opens it
    sharding::create_or_open(store.clone(), &ShardFn::NextToLast(2))
        .await
        .unwrap();

    let err = sharding::create_or_open(store, &ShardFn::Prefix(2))
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::ShardMismatch { .. }));
}

// =============================================================================
// Placement Tests
// =============================================================================

#[tokio::test]
async fn test_key_lands_in_shard_directory() {
    let raw = Arc::new(MemoryDatastore::new());
    let sharded = sharding::create_or_open(raw.clone(), &ShardFn::NextToLast(2))
        .await
        .unwrap();

    sharded.put(&Key::new("/hello"), Bytes::from_static(b"world")).await.unwrap();

    assert_eq!(raw.get(&Key::new("/ll/hello")).await.unwrap(), Bytes::from_static(b"world"));
    assert_eq!(sharded.get(&Key::new("/hello")).await.unwrap(), Bytes::from_static(b"world"));
    assert!(!raw.has(&Key::new("/hello")).await.unwrap());
}

#[tokio::test]
async fn test_short_keys_are_padded() {
    let raw = Arc::new(MemoryDatastore::new());
    let sharded = sharding::create_or_open(raw.clone(), &ShardFn::NextToLast(2))
        .await
        .unwrap();

    sharded.put(&Key::new("/a"), Bytes::from_static(b"1")).await.unwrap();

    assert!(raw.has(&Key::new("/__/a")).await.unwrap());
    assert_eq!(sorted_keys(&sharded).await, vec!["/a"]);
}

#[tokio::test]
async fn test_query_hides_reserved_keys() {
    let raw = Arc::new(MemoryDatastore::new());
    let sharded = sharding::create_or_open(raw.clone(), &ShardFn::Prefix(1))
        .await
        .unwrap();

    for key in ["/zeta", "/alpha", "/mid"] {
        sharded.put(&Key::new(key), Bytes::from_static(b"v")).await.unwrap();
    }

    assert_eq!(sorted_keys(&sharded).await, vec!["/alpha", "/mid", "/zeta"]);
    assert_eq!(raw.len(), 5);
}

#[tokio::test]
async fn test_delete_and_batch_through_shards() {
    let raw = Arc::new(MemoryDatastore::new());
    let sharded = sharding::create_or_open(raw.clone(), &ShardFn::Suffix(2))
        .await
        .unwrap();

    let mut batch = sharded.batch();
    batch
        .put(Key::new("/one"), Bytes::from_static(b"1"))
        .put(Key::new("/two"), Bytes::from_static(b"2"));
    sharded.commit(batch).await.unwrap();
    sharded.delete(&Key::new("/one")).await.unwrap();

    assert!(!sharded.has(&Key::new("/one")).await.unwrap());
    assert!(raw.has(&Key::new("/wo/two")).await.unwrap());
    assert_eq!(sorted_keys(&sharded).await, vec!["/two"]);
}

#[test]
fn test_shard_transform_inverse_law() {
    let functions = [ShardFn::Prefix(2), ShardFn::Suffix(3), ShardFn::NextToLast(2)];
    let keys = ["/hello", "/abc", "/a", "/nested/key/here", "/...", "/x:y"];

    for shard in functions {
        let transform = atlasds::sharding::ShardTransform::new(shard);
        for key in keys {
            let key = Key::new(key);
            let converted = transform.convert(&key);
            assert!(transform.admits(&converted), "{shard}: {converted} not admitted");
            assert_eq!(transform.invert(&converted), key, "{shard}");
        }
    }
}

// =============================================================================
// Filesystem Tests
// =============================================================================

#[tokio::test]
async fn test_sharded_fs_layout() {
    let temp_dir = TempDir::new().unwrap();
    let fs_store = FsDatastore::open_path(temp_dir.path()).await.unwrap();
    let sharded = sharding::create_or_open(fs_store, &ShardFn::NextToLast(2))
        .await
        .unwrap();

    sharded.put(&Key::new("/hello"), Bytes::from_static(b"h")).await.unwrap();
    sharded.put(&Key::new("/world"), Bytes::from_static(b"w")).await.unwrap();

    assert!(temp_dir.path().join("SHARDING.data").is_file());
    assert!(temp_dir.path().join("_README.data").is_file());
    assert!(temp_dir.path().join("ll").join("hello.data").is_file());
    assert!(temp_dir.path().join("rl").join("world.data").is_file());
    assert_eq!(sorted_keys(&sharded).await, vec!["/hello", "/world"]);
}

#[tokio::test]
async fn test_sharded_fs_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let fs_store = FsDatastore::open_path(temp_dir.path()).await.unwrap();
        let sharded = sharding::create_or_open(fs_store, &ShardFn::Prefix(2))
            .await
            .unwrap();
        sharded.put(&Key::new("/persisted"), Bytes::from_static(b"p")).await.unwrap();
        sharded.close().await.unwrap();
    }

    let fs_store = FsDatastore::open_path(temp_dir.path()).await.unwrap();
    let sharded = sharding::open(fs_store, Some(&ShardFn::Prefix(2))).await.unwrap();

    assert_eq!(sharded.get(&Key::new("/persisted")).await.unwrap(), Bytes::from_static(b"p"));
}
