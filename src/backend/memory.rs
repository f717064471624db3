//! In-memory backend
//!
//! HashMap-based store for tests and embedding.

use std::collections::HashMap;
use std::future::ready;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use crate::datastore::{Batch, Datastore};
use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::query::{self, Entry, Query, QueryStream};

/// In-memory datastore
///
/// ## Query Consistency
/// A query snapshots the key set when enumeration starts and reads each
/// value from the live map as the entry is pulled. Writes made while a
/// query is in flight may or may not show up; a key deleted before its
/// value is read is skipped.
pub struct MemoryDatastore {
    data: RwLock<HashMap<Key, Bytes>>,
}

impl MemoryDatastore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        self.data.write().insert(key.clone(), value);
        Ok(())
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| AtlasError::not_found(key))
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        let (puts, deletes) = batch.into_parts();
        let mut data = self.data.write();
        for (key, value) in puts {
            data.insert(key, value);
        }
        for key in deletes {
            data.remove(&key);
        }
        Ok(())
    }

    fn query(&self, q: Query) -> QueryStream<'_> {
        // Snapshot keys only; the prefix is checked before any value read
        let keys: Vec<Key> = self
            .data
            .read()
            .keys()
            .filter(|k| query::prefix_matches(k, &q))
            .cloned()
            .collect();

        let keys_only = q.keys_only;
        let source = stream::iter(keys).filter_map(move |key| {
            let entry = if keys_only {
                Some(Entry::key_only(key))
            } else {
                let value = self.data.read().get(&key).cloned();
                value.map(|v| Entry::new(key, v))
            };
            ready(entry.map(Ok::<Entry, AtlasError>))
        });

        query::execute(source, q)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatastore")
            .field("key_count", &self.len())
            .finish()
    }
}
