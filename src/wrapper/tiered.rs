//! Tiered wrapper
//!
//! Write-through to every tier, read from the first tier that answers.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tracing::trace;

use crate::datastore::{Batch, Datastore};
use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::query::{Query, QueryStream};

/// Ordered list of stores, fastest first
///
/// | Operation | Behaviour |
/// |-----------|-----------|
/// | `put` / `delete` / `commit` / `close` | every tier, first error reported, nothing rolled back |
/// | `get` / `has` | tiers in order, first `Ok` wins, errors fall through |
/// | `query` | last tier only |
///
/// `has` returns the first tier's `Ok(false)` as-is; only an error moves
/// it on to the next tier.
pub struct TieredDatastore {
    stores: Vec<Box<dyn Datastore>>,
}

impl TieredDatastore {
    /// Build from at least one store
    pub fn new(stores: Vec<Box<dyn Datastore>>) -> Result<Self> {
        if stores.is_empty() {
            return Err(AtlasError::Config(
                "TieredDatastore needs at least one store".to_string(),
            ));
        }
        Ok(Self { stores })
    }

    pub fn stores(&self) -> &[Box<dyn Datastore>] {
        &self.stores
    }

    /// Every tier's result in list order collapsed to the first error
    fn first_error(results: Vec<Result<()>>) -> Result<()> {
        results.into_iter().collect()
    }

    fn last(&self) -> &dyn Datastore {
        // Non-empty by construction
        self.stores[self.stores.len() - 1].as_ref()
    }
}

#[async_trait]
impl Datastore for TieredDatastore {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        let results = join_all(self.stores.iter().map(|s| s.put(key, value.clone()))).await;
        Self::first_error(results)
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        let mut first_err = None;
        for (tier, store) in self.stores.iter().enumerate() {
            match store.get(key).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    trace!(%key, tier, error = %e, "get fell through");
                    first_err.get_or_insert(e);
                }
            }
        }
        Err(first_err.unwrap_or_else(|| AtlasError::not_found(key)))
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        let mut first_err = None;
        for (tier, store) in self.stores.iter().enumerate() {
            match store.has(key).await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    trace!(%key, tier, error = %e, "has fell through");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        let results = join_all(self.stores.iter().map(|s| s.delete(key))).await;
        Self::first_error(results)
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        let results = join_all(self.stores.iter().map(|s| s.commit(batch.clone()))).await;
        Self::first_error(results)
    }

    fn query(&self, q: Query) -> QueryStream<'_> {
        self.last().query(q)
    }

    async fn close(&self) -> Result<()> {
        let results = join_all(self.stores.iter().map(|s| s.close())).await;
        Self::first_error(results)
    }
}

impl std::fmt::Debug for TieredDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredDatastore")
            .field("tiers", &self.stores.len())
            .finish()
    }
}
