//! Sorted-engine backend
//!
//! Adapts the embedded LSM [`Engine`] to the async `Datastore` contract.
//! Every engine call runs on tokio's blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, TryStreamExt};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::config::EngineConfig;
use crate::datastore::{Batch, Datastore};
use crate::engine::Engine;
use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::query::{self, Entry, Query, QueryStream};
use crate::storage::MergeCursor;

/// Entries pulled from the engine per blocking task while scanning
const SCAN_CHUNK: usize = 256;

/// Datastore backed by the sorted engine
///
/// Queries enumerate keys in ascending byte order. A query reads the
/// memtable and SSTables as they were when its first entry was pulled.
#[derive(Clone)]
pub struct EngineDatastore {
    engine: Arc<Engine>,
}

impl EngineDatastore {
    /// Open (or create) an engine directory
    pub async fn open(config: EngineConfig) -> Result<Self> {
        let engine = spawn_blocking(move || Engine::open(config)).await??;
        Ok(Self::from_engine(Arc::new(engine)))
    }

    /// Wrap an already open engine
    pub fn from_engine(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Run `f` against the engine off the async executor
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Engine) -> Result<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        spawn_blocking(move || f(&*engine)).await?
    }
}

#[async_trait]
impl Datastore for EngineDatastore {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        let key = key.as_bytes().to_vec();
        self.blocking(move |engine| engine.put(&key, &value)).await
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        let raw = key.as_bytes().to_vec();
        match self.blocking(move |engine| engine.get(&raw)).await? {
            Some(value) => Ok(Bytes::from(value)),
            None => Err(AtlasError::not_found(key)),
        }
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        let raw = key.as_bytes().to_vec();
        let value = self.blocking(move |engine| engine.get(&raw)).await?;
        Ok(value.is_some())
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        let key = key.as_bytes().to_vec();
        self.blocking(move |engine| engine.delete(&key)).await
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        let (puts, deletes) = batch.into_parts();
        debug!(puts = puts.len(), deletes = deletes.len(), "Committing batch");

        let puts: Vec<(Vec<u8>, Vec<u8>)> = puts
            .into_iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.to_vec()))
            .collect();
        let deletes: Vec<Vec<u8>> = deletes.iter().map(|k| k.as_bytes().to_vec()).collect();

        self.blocking(move |engine| engine.write_batch(puts, deletes))
            .await
    }

    fn query(&self, q: Query) -> QueryStream<'_> {
        let keys_only = q.keys_only;
        let prefix_query = q.clone();

        let source = scan(self.engine.clone(), !keys_only).try_filter_map(move |(raw, value)| {
            let entry = decode_key(raw).map(|key| {
                if !query::prefix_matches(&key, &prefix_query) {
                    None
                } else if keys_only {
                    Some(Entry::key_only(key))
                } else {
                    Some(Entry::new(key, Bytes::from(value)))
                }
            });
            async move { entry }
        });

        query::execute(source, q)
    }

    async fn close(&self) -> Result<()> {
        self.blocking(|engine| engine.close()).await
    }
}

impl std::fmt::Debug for EngineDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDatastore")
            .field("data_dir", &self.engine.data_dir())
            .finish()
    }
}

fn decode_key(raw: Vec<u8>) -> Result<Key> {
    String::from_utf8(raw)
        .map(|s| Key::new(&s))
        .map_err(|e| AtlasError::InvalidKey(format!("Non UTF-8 key in engine: {}", e)))
}

/// Stream every live pair, pulling `SCAN_CHUNK` entries per blocking task
///
/// The cursor is created lazily on first poll and moves in and out of the
/// blocking pool between chunks.
fn scan(
    engine: Arc<Engine>,
    with_values: bool,
) -> impl Stream<Item = Result<(Vec<u8>, Vec<u8>)>> + Send + 'static {
    stream::try_unfold(None::<MergeCursor>, move |cursor| {
        let engine = engine.clone();
        async move {
            let (chunk, cursor) = spawn_blocking(move || {
                let mut cursor = match cursor {
                    Some(cursor) => cursor,
                    None => engine.cursor(with_values)?,
                };
                let chunk: Vec<_> = cursor.by_ref().take(SCAN_CHUNK).collect();
                Ok::<_, AtlasError>((chunk, cursor))
            })
            .await??;

            if chunk.is_empty() {
                return Ok(None);
            }
            Ok::<_, AtlasError>(Some((stream::iter(chunk), Some(cursor))))
        }
    })
    .try_flatten()
}
