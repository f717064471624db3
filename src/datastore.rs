//! Datastore Module
//!
//! The one contract every backend and wrapper implements.
//!
//! ## Contract
//! | Method | Behaviour |
//! |--------|-----------|
//! | `put` | store `value` under `key`, overwriting |
//! | `get` | value for `key`, `NotFound` when absent |
//! | `has` | presence check, never `NotFound` |
//! | `delete` | remove `key`; absent keys are a no-op |
//! | `batch` / `commit` | deferred puts and deletes, applied puts-then-deletes |
//! | `query` | lazy stream of entries through the query pipeline |
//! | `close` | release backend resources, idempotent |

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::key::Key;
use crate::query::{Query, QueryStream};

/// Uniform async key-value store
///
/// Implementations are `Send + Sync` and may be nested arbitrarily:
/// wrappers hold any other `Datastore` as their child.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Store a value, overwriting any previous one
    async fn put(&self, key: &Key, value: Bytes) -> Result<()>;

    /// Fetch a value; `AtlasError::NotFound` when the key is absent
    async fn get(&self, key: &Key) -> Result<Bytes>;

    /// Check whether a key is present
    async fn has(&self, key: &Key) -> Result<bool>;

    /// Remove a key; deleting an absent key succeeds
    async fn delete(&self, key: &Key) -> Result<()>;

    /// Start an empty batch for this store
    fn batch(&self) -> Batch {
        Batch::new()
    }

    /// Apply a batch: every put, then every delete
    ///
    /// Each operation is individually durable once this returns; there is
    /// no all-or-nothing guarantee across the batch.
    async fn commit(&self, batch: Batch) -> Result<()> {
        let (puts, deletes) = batch.into_parts();
        for (key, value) in puts {
            self.put(&key, value).await?;
        }
        for key in deletes {
            self.delete(&key).await?;
        }
        Ok(())
    }

    /// Run a query; the stream may fail mid-way and ends after the error
    fn query(&self, query: Query) -> QueryStream<'_>;

    /// Release backend resources (idempotent)
    async fn close(&self) -> Result<()>;
}

// =============================================================================
// Batch
// =============================================================================

/// Accumulator of pending puts and deletes, consumed by `commit`
///
/// Puts are applied before deletes. Putting and deleting the same key in
/// one batch therefore leaves it deleted.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    puts: Vec<(Key, Bytes)>,
    deletes: Vec<Key>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put
    pub fn put(&mut self, key: Key, value: impl Into<Bytes>) -> &mut Self {
        self.puts.push((key, value.into()));
        self
    }

    /// Queue a delete
    pub fn delete(&mut self, key: Key) -> &mut Self {
        self.deletes.push(key);
        self
    }

    pub fn puts(&self) -> &[(Key, Bytes)] {
        &self.puts
    }

    pub fn deletes(&self) -> &[Key] {
        &self.deletes
    }

    /// Total queued operations
    pub fn len(&self) -> usize {
        self.puts.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }

    /// Rewrite every key (used by key-transforming wrappers)
    pub fn map_keys(self, mut f: impl FnMut(&Key) -> Key) -> Batch {
        Batch {
            puts: self.puts.into_iter().map(|(k, v)| (f(&k), v)).collect(),
            deletes: self.deletes.iter().map(&mut f).collect(),
        }
    }

    pub fn into_parts(self) -> (Vec<(Key, Bytes)>, Vec<Key>) {
        (self.puts, self.deletes)
    }
}

// =============================================================================
// Pointer Impls
// =============================================================================

#[async_trait]
impl<T: Datastore + ?Sized> Datastore for Box<T> {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        (**self).get(key).await
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        (**self).has(key).await
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        (**self).delete(key).await
    }

    fn batch(&self) -> Batch {
        (**self).batch()
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        (**self).commit(batch).await
    }

    fn query(&self, query: Query) -> QueryStream<'_> {
        (**self).query(query)
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<T: Datastore + ?Sized> Datastore for Arc<T> {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        (**self).get(key).await
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        (**self).has(key).await
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        (**self).delete(key).await
    }

    fn batch(&self) -> Batch {
        (**self).batch()
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        (**self).commit(batch).await
    }

    fn query(&self, query: Query) -> QueryStream<'_> {
        (**self).query(query)
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
