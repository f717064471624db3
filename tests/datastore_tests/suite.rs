//! Behaviour every `Datastore` must share, run against each backend

use std::collections::BTreeSet;
use std::sync::Arc;

use atlasds::query::{filter_fn, order_fn, try_filter_fn, Order, OrderByKey};
use atlasds::{AtlasError, Datastore, Entry, Key, Query};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use futures::{StreamExt, TryStreamExt};

// =============================================================================
// Helpers
// =============================================================================

pub async fn collect(store: &dyn Datastore, query: Query) -> Vec<Entry> {
    store.query(query).try_collect().await.unwrap()
}

pub async fn key_set(store: &dyn Datastore, query: Query) -> BTreeSet<String> {
    collect(store, query)
        .await
        .into_iter()
        .map(|e| e.key.to_string())
        .collect()
}

fn set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

async fn seed(store: &dyn Datastore, keys: &[&str]) {
    for key in keys {
        store
            .put(&Key::new(key), Bytes::from(format!("value of {}", key)))
            .await
            .unwrap();
    }
}

struct Reverse;

#[async_trait]
impl Order for Reverse {
    async fn order(&self, mut entries: Vec<Entry>) -> atlasds::Result<Vec<Entry>> {
        entries.reverse();
        Ok(entries)
    }
}

struct FailingOrder;

#[async_trait]
impl Order for FailingOrder {
    async fn order(&self, _entries: Vec<Entry>) -> atlasds::Result<Vec<Entry>> {
        Err(AtlasError::stage("order exploded"))
    }
}

// =============================================================================
// Point Operations
// =============================================================================

pub async fn put_get(store: &dyn Datastore) {
    let key = Key::new("/z/one");
    store.put(&key, Bytes::from_static(b"one")).await.unwrap();

    assert_eq!(store.get(&key).await.unwrap(), Bytes::from_static(b"one"));
}

pub async fn put_overwrites(store: &dyn Datastore) {
    let key = Key::new("/over");
    store.put(&key, Bytes::from_static(b"first")).await.unwrap();
    store.put(&key, Bytes::from_static(b"second")).await.unwrap();

    assert_eq!(store.get(&key).await.unwrap(), Bytes::from_static(b"second"));
}

pub async fn binary_values_round_trip(store: &dyn Datastore) {
    let key = Key::new("/bin");
    let value: Vec<u8> = (0..=255u8).collect();
    store.put(&key, Bytes::from(value.clone())).await.unwrap();

    assert_eq!(store.get(&key).await.unwrap().as_ref(), value.as_slice());
}

pub async fn get_missing_is_not_found(store: &dyn Datastore) {
    let err = store.get(&Key::new("/missing")).await.unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {}", err);
    assert!(!store.has(&Key::new("/missing")).await.unwrap());
}

pub async fn delete_then_has(store: &dyn Datastore) {
    let key = Key::new("/z/one");
    store.put(&key, Bytes::from_static(b"one")).await.unwrap();
    assert!(store.has(&key).await.unwrap());

    store.delete(&key).await.unwrap();

    assert!(!store.has(&key).await.unwrap());
    assert!(store.get(&key).await.unwrap_err().is_not_found());
}

pub async fn delete_missing_is_ok(store: &dyn Datastore) {
    store.delete(&Key::new("/never/written")).await.unwrap();
}

// =============================================================================
// Batches
// =============================================================================

pub async fn batch_puts_and_deletes(store: &dyn Datastore) {
    let d = Key::new("/d");
    store.put(&d, Bytes::from_static(b"4")).await.unwrap();

    let mut batch = store.batch();
    batch
        .put(Key::new("/a"), Bytes::from_static(b"1"))
        .put(Key::new("/b"), Bytes::from_static(b"2"))
        .put(Key::new("/c"), Bytes::from_static(b"3"))
        .delete(d.clone());
    store.commit(batch).await.unwrap();

    for key in ["/a", "/b", "/c"] {
        assert!(store.has(&Key::new(key)).await.unwrap(), "{} missing", key);
    }
    assert!(!store.has(&d).await.unwrap());
}

pub async fn batch_deletes_after_puts(store: &dyn Datastore) {
    let key = Key::new("/both");
    let mut batch = store.batch();
    batch.delete(key.clone()).put(key.clone(), Bytes::from_static(b"x"));
    store.commit(batch).await.unwrap();

    assert!(!store.has(&key).await.unwrap());
}

pub async fn large_batch(store: &dyn Datastore) {
    let mut batch = store.batch();
    for prefix in ["/a", "/b", "/c"] {
        for i in 0..400 {
            batch.put(
                Key::new(format!("{}/{}", prefix, i)),
                Bytes::from(format!("data{}", i)),
            );
        }
    }
    store.commit(batch).await.unwrap();

    let all = collect(store, Query::new().keys_only(true)).await;
    assert_eq!(all.len(), 1200);

    let b_only = collect(store, Query::new().prefix("/b/")).await;
    assert_eq!(b_only.len(), 400);
    assert!(b_only.iter().all(|e| e.value.is_some()));
}

pub async fn parallel_puts(store: &dyn Datastore) {
    try_join_all((0..100).map(|i| {
        let key = Key::new(format!("/parallel/{}", i));
        async move { store.put(&key, Bytes::from(format!("{}", i))).await }
    }))
    .await
    .unwrap();

    let found = collect(store, Query::new().prefix("/parallel/")).await;
    assert_eq!(found.len(), 100);
    for entry in found {
        let expected = entry.key.base_namespace().to_string();
        assert_eq!(entry.value.unwrap(), Bytes::from(expected));
    }
}

// =============================================================================
// Queries
// =============================================================================

pub async fn query_prefix_and_filter(store: &dyn Datastore) {
    seed(store, &["/q/hello", "/z/world", "/z/hello2"]).await;

    assert_eq!(key_set(store, Query::new().prefix("/q")).await, set(&["/q/hello"]));

    let not_hello = filter_fn(|e: &Entry| !e.key.as_str().ends_with("hello"));
    assert_eq!(
        key_set(store, Query::new().filter(not_hello.clone())).await,
        set(&["/z/world", "/z/hello2"])
    );

    assert!(key_set(store, Query::new().prefix("/q").filter(not_hello)).await.is_empty());
}

pub async fn query_prefix_is_bytewise(store: &dyn Datastore) {
    seed(store, &["/ab", "/a/b", "/b"]).await;

    assert_eq!(key_set(store, Query::new().prefix("/a")).await, set(&["/ab", "/a/b"]));
}

pub async fn query_offset_limit_after_order(store: &dyn Datastore) {
    seed(store, &["/1", "/2", "/3"]).await;

    let query = Query::new()
        .order(Arc::new(OrderByKey))
        .order(Arc::new(Reverse))
        .offset(1)
        .limit(1);
    let keys: Vec<String> = collect(store, query)
        .await
        .into_iter()
        .map(|e| e.key.to_string())
        .collect();

    assert_eq!(keys, vec!["/2".to_string()]);
}

pub async fn query_ordered_by_comparator(store: &dyn Datastore) {
    seed(store, &["/b", "/c", "/a"]).await;

    let by_key_desc = order_fn(|a: &Entry, b: &Entry| b.key.cmp(&a.key));
    let keys: Vec<String> = collect(store, Query::new().order(by_key_desc))
        .await
        .into_iter()
        .map(|e| e.key.to_string())
        .collect();

    assert_eq!(keys, vec!["/c", "/b", "/a"]);
}

pub async fn query_keys_only(store: &dyn Datastore) {
    seed(store, &["/k/1", "/k/2"]).await;

    let entries = collect(store, Query::new().prefix("/k/").keys_only(true)).await;

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.value.is_none()));
}

pub async fn query_values_hydrated(store: &dyn Datastore) {
    seed(store, &["/v/1"]).await;

    let entries = collect(store, Query::new().prefix("/v/")).await;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value.as_deref(), Some(&b"value of /v/1"[..]));
}

pub async fn query_filter_error_aborts(store: &dyn Datastore) {
    seed(store, &["/e/1", "/e/2", "/e/3"]).await;

    let failing = try_filter_fn(|_: &Entry| Err(AtlasError::stage("filter exploded")));
    let results: Vec<_> = store.query(Query::new().filter(failing)).collect().await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(AtlasError::Stage(_))));
}

pub async fn query_order_error_aborts(store: &dyn Datastore) {
    seed(store, &["/e/1", "/e/2"]).await;

    let results: Vec<_> = store
        .query(Query::new().order(Arc::new(FailingOrder)))
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(AtlasError::Stage(_))));
}

pub async fn query_early_termination(store: &dyn Datastore) {
    seed(store, &["/t/1", "/t/2", "/t/3"]).await;

    let mut stream = store.query(Query::new());
    let first = stream.next().await.unwrap().unwrap();
    drop(stream);

    // Store stays usable after an abandoned query
    store.delete(&first.key).await.unwrap();
    assert_eq!(collect(store, Query::new().prefix("/t/")).await.len(), 2);
}

pub async fn close_is_idempotent(store: &dyn Datastore) {
    store.close().await.unwrap();
    store.close().await.unwrap();
}
