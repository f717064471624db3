//! Key-transform wrapper
//!
//! Rewrites keys on the way into a child store and back out of its
//! queries. The caller only ever sees its own key space.

use std::future::ready;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::TryStreamExt;

use crate::datastore::{Batch, Datastore};
use crate::error::{AtlasError, Result};
use crate::key::Key;
use crate::query::{self, Entry, Query, QueryStream};

/// A pair of mutually inverse key mappings
///
/// Implementations must satisfy `invert(convert(k)) == k` for every key
/// the wrapper is used with. The wrapper does not check this.
pub trait KeyTransform: Send + Sync {
    /// Caller key → child key
    fn convert(&self, key: &Key) -> Key;

    /// Child key → caller key
    fn invert(&self, key: &Key) -> Key;

    /// Literal prefix shared by every converted key, if there is one
    ///
    /// Passed down as the child query's prefix to narrow its scan.
    fn child_prefix(&self) -> Option<String> {
        None
    }

    /// Whether a child key belongs to this view at all
    ///
    /// Child keys that are rejected never reach `invert` or the caller.
    fn admits(&self, _raw: &Key) -> bool {
        true
    }
}

/// Datastore that applies a [`KeyTransform`] around a child
pub struct KeyTransformDatastore<D, T> {
    child: D,
    transform: T,
}

impl<D: Datastore, T: KeyTransform> KeyTransformDatastore<D, T> {
    pub fn new(child: D, transform: T) -> Self {
        Self { child, transform }
    }

    /// The wrapped store, addressed in converted keys
    pub fn child(&self) -> &D {
        &self.child
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn into_inner(self) -> D {
        self.child
    }
}

#[async_trait]
impl<D: Datastore, T: KeyTransform> Datastore for KeyTransformDatastore<D, T> {
    async fn put(&self, key: &Key, value: Bytes) -> Result<()> {
        self.child.put(&self.transform.convert(key), value).await
    }

    async fn get(&self, key: &Key) -> Result<Bytes> {
        self.child.get(&self.transform.convert(key)).await
    }

    async fn has(&self, key: &Key) -> Result<bool> {
        self.child.has(&self.transform.convert(key)).await
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.child.delete(&self.transform.convert(key)).await
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        let converted = batch.map_keys(|key| self.transform.convert(key));
        self.child.commit(converted).await
    }

    /// Lists child keys only, inverts them, applies `q.prefix` in the
    /// caller's key space, and reads values for the survivors alone
    ///
    /// A key removed from the child between listing and reading is
    /// skipped.
    fn query(&self, q: Query) -> QueryStream<'_> {
        let keys_only = q.keys_only;
        let prefix_query = q.clone();

        let mut listing = Query::new().keys_only(true);
        if let Some(prefix) = self.transform.child_prefix() {
            listing = listing.prefix(prefix);
        }

        let transform = &self.transform;
        let child = &self.child;
        let source = child
            .query(listing)
            .try_filter_map(move |entry| {
                let candidate = if transform.admits(&entry.key) {
                    let key = transform.invert(&entry.key);
                    query::prefix_matches(&key, &prefix_query).then_some((entry.key, key))
                } else {
                    None
                };
                ready(Ok::<_, AtlasError>(candidate))
            })
            .try_filter_map(move |(child_key, key)| async move {
                if keys_only {
                    return Ok(Some(Entry::key_only(key)));
                }
                match child.get(&child_key).await {
                    Ok(value) => Ok(Some(Entry::new(key, value))),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e),
                }
            });

        query::execute(source, q)
    }

    async fn close(&self) -> Result<()> {
        self.child.close().await
    }
}

impl<D: std::fmt::Debug, T: std::fmt::Debug> std::fmt::Debug for KeyTransformDatastore<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTransformDatastore")
            .field("transform", &self.transform)
            .field("child", &self.child)
            .finish()
    }
}

// =============================================================================
// Namespacing
// =============================================================================

/// Nests every key under a fixed prefix key: `/a` ↔ `{prefix}/a`
#[derive(Debug, Clone)]
pub struct PrefixTransform {
    prefix: Key,
}

impl PrefixTransform {
    pub fn new(prefix: Key) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> &Key {
        &self.prefix
    }
}

impl KeyTransform for PrefixTransform {
    fn convert(&self, key: &Key) -> Key {
        self.prefix.child(key)
    }

    fn invert(&self, key: &Key) -> Key {
        if self.prefix.is_root() {
            return key.clone();
        }
        match key.as_str().strip_prefix(self.prefix.as_str()) {
            Some(rest) if key.is_descendant_of(&self.prefix) => Key::new(rest),
            _ => key.clone(),
        }
    }

    fn child_prefix(&self) -> Option<String> {
        if self.prefix.is_root() {
            None
        } else {
            Some(format!("{}/", self.prefix))
        }
    }

    fn admits(&self, raw: &Key) -> bool {
        raw.is_descendant_of(&self.prefix)
    }
}

/// A child store seen through a fixed key namespace
pub type NamespaceDatastore<D> = KeyTransformDatastore<D, PrefixTransform>;

impl<D: Datastore> KeyTransformDatastore<D, PrefixTransform> {
    /// Nest every key of `child` under `prefix`
    pub fn namespace(prefix: Key, child: D) -> Self {
        Self::new(child, PrefixTransform::new(prefix))
    }
}
