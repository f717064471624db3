//! Query Module
//!
//! Backend-independent query execution.
//!
//! ## Responsibilities
//! - Describe a query (prefix, filters, orders, offset, limit, keys-only)
//! - Run any backend's raw entry stream through one fixed pipeline
//! - Stay lazy until an order stage forces materialization
//!
//! ## Pipeline
//! ```text
//! source ─► hydrate ─► prefix ─► filter₁ … filterₙ ─► order₁ … orderₘ ─► offset ─► limit
//!  (backend)  (backend)                                  (materializes)
//! ```
//!
//! The first error from any stage is yielded once and ends the stream.

mod pipeline;
mod stages;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::key::Key;

pub use pipeline::{execute, prefix_matches};
pub use stages::{filter_fn, order_fn, try_filter_fn, FilterFn, OrderByKey, OrderByKeyDescending, OrderFn, TryFilterFn};

/// Lazy, fallible sequence of query results
///
/// Dropping the stream early releases whatever backend cursor or file
/// handle feeds it.
pub type QueryStream<'a> = BoxStream<'a, Result<Entry>>;

/// A (key, optional value) pair produced by enumeration
///
/// `value` is `None` when the query runs in keys-only mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Option<Bytes>,
}

impl Entry {
    pub fn new(key: Key, value: Bytes) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub fn key_only(key: Key) -> Self {
        Self { key, value: None }
    }
}

/// A predicate stage: passes or rejects one entry
#[async_trait]
pub trait Filter: Send + Sync {
    /// `Ok(true)` keeps the entry, `Ok(false)` drops it, `Err` aborts the query
    async fn filter(&self, entry: &Entry) -> Result<bool>;
}

/// An ordering stage over the fully materialized result list
#[async_trait]
pub trait Order: Send + Sync {
    /// Return `entries` re-ordered, or fail and abort the query
    async fn order(&self, entries: Vec<Entry>) -> Result<Vec<Entry>>;
}

/// Immutable description of a query
#[derive(Clone, Default)]
pub struct Query {
    /// Keep entries whose key string starts with this literal prefix
    pub prefix: Option<String>,

    /// Applied in order, before any order stage
    pub filters: Vec<Arc<dyn Filter>>,

    /// Applied left to right after all filters
    pub orders: Vec<Arc<dyn Order>>,

    /// Entries skipped after filtering and ordering
    pub offset: Option<usize>,

    /// Max entries returned, counted after `offset`
    pub limit: Option<usize>,

    /// Return keys without values
    pub keys_only: bool,
}

impl Query {
    /// A query matching every entry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Arc<dyn Order>) -> Self {
        self.orders.push(order);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keys_only(mut self, keys_only: bool) -> Self {
        self.keys_only = keys_only;
        self
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("prefix", &self.prefix)
            .field("filters", &self.filters.len())
            .field("orders", &self.orders.len())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("keys_only", &self.keys_only)
            .finish()
    }
}
