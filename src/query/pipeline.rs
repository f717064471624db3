//! Query Pipeline
//!
//! Composes prefix, filter, order, offset and limit stages over a raw
//! entry stream. Backends hand over a lazily hydrated source; everything
//! after that is identical for every store.

use std::future::ready;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::error::{AtlasError, Result};
use crate::key::Key;

use super::{Entry, Query, QueryStream};

/// Key-level prefix check, usable by a backend before it pays for a value read
pub fn prefix_matches(key: &Key, query: &Query) -> bool {
    match &query.prefix {
        Some(prefix) => key.as_str().starts_with(prefix.as_str()),
        None => true,
    }
}

/// Run `source` through the query pipeline
///
/// Stage order is fixed: prefix, filters, orders, offset, limit. The
/// result stays lazy unless `query` has an order stage; in that case the
/// surviving entries are collected on first poll.
pub fn execute<'a, S>(source: S, query: Query) -> QueryStream<'a>
where
    S: Stream<Item = Result<Entry>> + Send + 'a,
{
    let Query {
        prefix,
        filters,
        orders,
        offset,
        limit,
        keys_only,
    } = query;

    let mut pipeline = stop_on_error(source).boxed();

    // Step 1: Prefix (byte-wise, not segment-aware)
    if let Some(prefix) = prefix {
        pipeline = pipeline
            .try_filter(move |entry| ready(entry.key.as_str().starts_with(prefix.as_str())))
            .boxed();
    }

    // Step 2: User filters, in declaration order
    for filter in filters {
        pipeline = pipeline
            .try_filter_map(move |entry| {
                let filter = filter.clone();
                async move {
                    let keep = filter.filter(&entry).await?;
                    Ok::<_, AtlasError>(keep.then_some(entry))
                }
            })
            .boxed();
    }

    // Step 3: Orders force materialization of everything left
    if !orders.is_empty() {
        let sorted = async move {
            let mut entries: Vec<Entry> = pipeline.try_collect().await?;
            for order in &orders {
                entries = order.order(entries).await?;
            }
            Ok::<_, AtlasError>(stream::iter(entries.into_iter().map(Ok::<Entry, AtlasError>)))
        };
        pipeline = stream::once(sorted).try_flatten().boxed();
    }

    // Step 4: Offset
    if let Some(offset) = offset.filter(|n| *n > 0) {
        let mut seen = 0usize;
        pipeline = pipeline
            .try_filter(move |_| {
                let keep = seen >= offset;
                seen += 1;
                ready(keep)
            })
            .boxed();
    }

    // Step 5: Limit
    if let Some(limit) = limit {
        pipeline = pipeline.take(limit).boxed();
    }

    if keys_only {
        pipeline = pipeline
            .map_ok(|mut entry| {
                entry.value = None;
                entry
            })
            .boxed();
    }

    stop_on_error(pipeline).boxed()
}

/// Yield the first error, then end the stream
fn stop_on_error<'a, S>(source: S) -> impl Stream<Item = Result<Entry>> + Send + 'a
where
    S: Stream<Item = Result<Entry>> + Send + 'a,
{
    source.scan(false, |failed, item| {
        if *failed {
            return ready(None);
        }
        *failed = item.is_err();
        ready(Some(item))
    })
}
