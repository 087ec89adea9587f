//! Grouped processing with a scheduler yield between groups.
//!
//! Items are split into consecutive groups of `batch_size`. The items of one
//! group run concurrently; groups run one after another, and the task yields
//! back to the runtime after each group so a long job never monopolises a
//! worker. Results come back in input order.

use std::future::Future;

use futures_util::future::{join_all, try_join_all};
use tracing::debug;

use crate::Result;
use crate::telemetry;

/// Default number of items per group.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Run `processor` over `items` group by group. A `batch_size` of 0 is treated as 1.
pub async fn batch_process<T, R, F, Fut>(items: Vec<T>, processor: F, batch_size: usize) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let group: Vec<Fut> = items.by_ref().take(batch_size).map(&processor).collect();
        debug!(size = group.len(), "processing batch");
        results.extend(join_all(group).await);
        metrics::counter!(telemetry::BATCHES_TOTAL).increment(1);
        tokio::task::yield_now().await;
    }
    results
}

/// Like [`batch_process`], but stops at the first group containing a failure
/// and returns that error. Later groups are never started.
pub async fn try_batch_process<T, R, F, Fut>(
    items: Vec<T>,
    processor: F,
    batch_size: usize,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let group: Vec<Fut> = items.by_ref().take(batch_size).map(&processor).collect();
        results.extend(try_join_all(group).await?);
        metrics::counter!(telemetry::BATCHES_TOTAL).increment(1);
        tokio::task::yield_now().await;
    }
    Ok(results)
}
