//! Stock query stages and closure adapters

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

use super::{Entry, Filter, Order};

// =============================================================================
// Filters
// =============================================================================

/// Filter backed by an infallible closure
pub struct FilterFn<F>(pub F);

#[async_trait]
impl<F> Filter for FilterFn<F>
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    async fn filter(&self, entry: &Entry) -> Result<bool> {
        Ok((self.0)(entry))
    }
}

/// Filter backed by a fallible closure; an `Err` aborts the query
pub struct TryFilterFn<F>(pub F);

#[async_trait]
impl<F> Filter for TryFilterFn<F>
where
    F: Fn(&Entry) -> Result<bool> + Send + Sync,
{
    async fn filter(&self, entry: &Entry) -> Result<bool> {
        (self.0)(entry)
    }
}

/// `Query::filter(filter_fn(|e| ...))`
pub fn filter_fn<F>(f: F) -> Arc<dyn Filter>
where
    F: Fn(&Entry) -> bool + Send + Sync + 'static,
{
    Arc::new(FilterFn(f))
}

pub fn try_filter_fn<F>(f: F) -> Arc<dyn Filter>
where
    F: Fn(&Entry) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(TryFilterFn(f))
}

// =============================================================================
// Orders
// =============================================================================

/// Order backed by a comparator (stable sort)
pub struct OrderFn<F>(pub F);

#[async_trait]
impl<F> Order for OrderFn<F>
where
    F: Fn(&Entry, &Entry) -> Ordering + Send + Sync,
{
    async fn order(&self, mut entries: Vec<Entry>) -> Result<Vec<Entry>> {
        entries.sort_by(|a, b| (self.0)(a, b));
        Ok(entries)
    }
}

pub fn order_fn<F>(f: F) -> Arc<dyn Order>
where
    F: Fn(&Entry, &Entry) -> Ordering + Send + Sync + 'static,
{
    Arc::new(OrderFn(f))
}

/// Ascending key order
pub struct OrderByKey;

#[async_trait]
impl Order for OrderByKey {
    async fn order(&self, mut entries: Vec<Entry>) -> Result<Vec<Entry>> {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// Descending key order
pub struct OrderByKeyDescending;

#[async_trait]
impl Order for OrderByKeyDescending {
    async fn order(&self, mut entries: Vec<Entry>) -> Result<Vec<Entry>> {
        entries.sort_by(|a, b| b.key.cmp(&a.key));
        Ok(entries)
    }
}
