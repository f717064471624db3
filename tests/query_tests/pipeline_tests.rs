//! Tests for the query pipeline
//!
//! These tests drive `query::execute` with hand-built sources, so stage
//! semantics are checked independently of any backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use atlasds::query::{
    execute, filter_fn, order_fn, try_filter_fn, Filter, OrderByKey, OrderByKeyDescending,
};
use atlasds::{AtlasError, Entry, Key, Query, Result};
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};

// =============================================================================
// Helper Functions
// =============================================================================

fn source(keys: &[&str]) -> Vec<Result<Entry>> {
    keys.iter()
        .map(|k| Ok(Entry::new(Key::new(k), Bytes::from(k.to_string()))))
        .collect()
}

async fn run(keys: &[&str], query: Query) -> Vec<String> {
    execute(stream::iter(source(keys)), query)
        .map_ok(|e| e.key.to_string())
        .try_collect()
        .await
        .unwrap()
}

/// Async filter that counts how many entries reach it
struct Counting {
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Filter for Counting {
    async fn filter(&self, _entry: &Entry) -> Result<bool> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(true)
    }
}

// =============================================================================
// Stage Tests
// =============================================================================

#[tokio::test]
async fn test_no_stages_passes_everything() {
    let keys = run(&["/a", "/b"], Query::new()).await;

    assert_eq!(keys, vec!["/a", "/b"]);
}

#[tokio::test]
async fn test_filters_apply_in_order() {
    let query = Query::new()
        .filter(filter_fn(|e: &Entry| e.key.as_str() != "/a"))
        .filter(filter_fn(|e: &Entry| e.key.as_str() != "/c"));

    assert_eq!(run(&["/a", "/b", "/c"], query).await, vec!["/b"]);
}

#[tokio::test]
async fn test_orders_compose_left_to_right() {
    let by_len = order_fn(|a: &Entry, b: &Entry| a.key.as_str().len().cmp(&b.key.as_str().len()));
    let query = Query::new()
        .order(Arc::new(OrderByKeyDescending))
        .order(by_len);

    // Stable sort keeps the descending order within equal lengths
    assert_eq!(
        run(&["/a", "/ccc", "/b", "/dd"], query).await,
        vec!["/b", "/a", "/dd", "/ccc"]
    );
}

#[tokio::test]
async fn test_offset_and_limit_after_order() {
    let query = Query::new()
        .order(Arc::new(OrderByKeyDescending))
        .offset(1)
        .limit(1);

    assert_eq!(run(&["/1", "/2", "/3"], query).await, vec!["/2"]);
}

#[tokio::test]
async fn test_offset_past_end() {
    let query = Query::new().order(Arc::new(OrderByKey)).offset(10);

    assert!(run(&["/a", "/b"], query).await.is_empty());
}

#[tokio::test]
async fn test_limit_larger_than_source() {
    assert_eq!(run(&["/a"], Query::new().limit(5)).await, vec!["/a"]);
}

#[tokio::test]
async fn test_prefix_runs_before_filters() {
    let seen = Arc::new(AtomicUsize::new(0));
    let query = Query::new()
        .prefix("/q")
        .filter(Arc::new(Counting { seen: seen.clone() }));

    assert_eq!(run(&["/q/1", "/z/1", "/z/2"], query).await, vec!["/q/1"]);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_keys_only_drops_values() {
    let entries: Vec<Entry> = execute(stream::iter(source(&["/a"])), Query::new().keys_only(true))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(entries, vec![Entry::key_only(Key::new("/a"))]);
}

// =============================================================================
// Laziness Tests
// =============================================================================

#[tokio::test]
async fn test_unordered_query_is_lazy() {
    let seen = Arc::new(AtomicUsize::new(0));
    let query = Query::new()
        .filter(Arc::new(Counting { seen: seen.clone() }))
        .limit(2);

    let keys: Vec<_> = execute(stream::iter(source(&["/a", "/b", "/c", "/d"])), query)
        .collect()
        .await;

    assert_eq!(keys.len(), 2);
    // Limit stops pulling once satisfied
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_order_materializes_everything() {
    let seen = Arc::new(AtomicUsize::new(0));
    let query = Query::new()
        .filter(Arc::new(Counting { seen: seen.clone() }))
        .order(Arc::new(OrderByKey))
        .limit(1);

    let keys: Vec<_> = execute(stream::iter(source(&["/c", "/b", "/a"])), query)
        .collect()
        .await;

    assert_eq!(keys.len(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Error Tests
// =============================================================================

#[tokio::test]
async fn test_filter_error_ends_stream() {
    let failing = try_filter_fn(|e: &Entry| {
        if e.key.as_str() == "/b" {
            Err(AtlasError::stage("bad entry"))
        } else {
            Ok(true)
        }
    });

    let results: Vec<_> = execute(stream::iter(source(&["/a", "/b", "/c"])), Query::new().filter(failing))
        .collect()
        .await;

    // Entries before the error stay delivered
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().key, Key::new("/a"));
    assert!(matches!(results[1], Err(AtlasError::Stage(_))));
}

#[tokio::test]
async fn test_source_error_ends_stream() {
    let mut items = source(&["/a"]);
    items.push(Err(AtlasError::Storage("disk gone".into())));
    items.extend(source(&["/b"]));

    let results: Vec<_> = execute(stream::iter(items), Query::new()).collect().await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results[1], Err(AtlasError::Storage(_))));
}

#[tokio::test]
async fn test_source_error_before_order_aborts() {
    let mut items = source(&["/a"]);
    items.push(Err(AtlasError::Storage("disk gone".into())));

    let results: Vec<_> = execute(stream::iter(items), Query::new().order(Arc::new(OrderByKey)))
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}
