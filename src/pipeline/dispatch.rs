//! Bounded-concurrency dispatcher with ordered results.
//!
//! Jobs are admitted through `buffer_unordered(limit)`, so at most `limit`
//! futures are polled at once. Results land in a slot per index; the caller
//! always gets them back in index order regardless of completion order.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// How a dispatch ended.
#[derive(Debug)]
pub enum Dispatch<T> {
    /// Every job finished; results are in index order.
    Completed(Vec<T>),
    /// `stop` matched this result. Jobs still in flight were dropped.
    Stopped(T),
}

/// Run `job(i)` for every `i` in `0..count` with at most `limit` in flight.
///
/// When `stop` returns true for a finished result the remaining stream is
/// dropped, which cancels every in-flight job at its next await point.
pub async fn run_ordered<T, F, Fut, S>(count: usize, limit: usize, job: F, stop: S) -> Dispatch<T>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = T>,
    S: Fn(&T) -> bool,
{
    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();

    let mut results = stream::iter((0..count).map(|i| {
        let fut = job(i);
        async move { (i, fut.await) }
    }))
    .buffer_unordered(limit.max(1));

    while let Some((i, result)) = results.next().await {
        if stop(&result) {
            return Dispatch::Stopped(result);
        }
        slots[i] = Some(result);
    }

    Dispatch::Completed(slots.into_iter().flatten().collect())
}
