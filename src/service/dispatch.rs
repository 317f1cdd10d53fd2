//! Concurrent fan-out of partition scans.
//!
//! Every planned [`ShardRange`] becomes one task on a [`JoinSet`]. Each task
//! pages through its scan and appends the raw items to a shared accumulator.
//! The first failure cancels the shared token, the remaining tasks are
//! drained, and the query reports that failure only. Partial results are
//! never returned.

use super::Counters;
use crate::compute::range::ShardRange;
use crate::error::{GeoError, Result};
use crate::storage::item::Item;
use crate::storage::{ScanRequest, StorageGateway};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Raw scan results gathered from concurrent tasks.
#[derive(Debug, Default)]
pub(crate) struct ResultAccumulator {
    items: Mutex<Vec<Item>>,
}

impl ResultAccumulator {
    fn append(&self, items: Vec<Item>) {
        if !items.is_empty() {
            self.items.lock().extend(items);
        }
    }

    fn take(&self) -> Vec<Item> {
        std::mem::take(&mut *self.items.lock())
    }
}

/// Shared state for one query's scan tasks.
pub(crate) struct ScanDispatcher<G> {
    gateway: Arc<G>,
    projection: Option<Vec<String>>,
    limiter: Option<Arc<Semaphore>>,
    token: CancellationToken,
    counters: Arc<Counters>,
}

impl<G: StorageGateway + 'static> ScanDispatcher<G> {
    pub(crate) fn new(
        gateway: Arc<G>,
        projection: Option<Vec<String>>,
        max_concurrent_scans: Option<usize>,
        token: CancellationToken,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            gateway,
            projection,
            limiter: max_concurrent_scans.map(|limit| Arc::new(Semaphore::new(limit))),
            token,
            counters,
        }
    }

    /// Run one scan per entry of `plan` and return every raw item, or the
    /// first error any scan produced.
    pub(crate) async fn run(&self, plan: Vec<ShardRange>) -> Result<Vec<Item>> {
        let accumulator = Arc::new(ResultAccumulator::default());
        let mut tasks = JoinSet::new();

        for shard_range in plan {
            let request = ScanRequest {
                hash_key: shard_range.shard,
                range: shard_range.range,
                projection: self.projection.clone(),
            };
            tasks.spawn(scan_to_end(
                Arc::clone(&self.gateway),
                request,
                self.limiter.clone(),
                self.token.clone(),
                Arc::clone(&accumulator),
                Arc::clone(&self.counters),
            ));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(GeoError::TaskFailed(e.to_string())));
            if let Err(e) = outcome
                && first_error.is_none()
            {
                log::debug!("scan failed, cancelling remaining scans: {}", e);
                self.token.cancel();
                first_error = Some(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(accumulator.take()),
        }
    }
}

async fn acquire(limiter: Option<Arc<Semaphore>>, token: &CancellationToken) -> Result<Option<OwnedSemaphorePermit>> {
    let Some(limiter) = limiter else {
        return Ok(None);
    };
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(GeoError::Cancelled),
        permit = limiter.acquire_owned() => permit
            .map(Some)
            .map_err(|_| GeoError::TaskFailed("scan limiter closed".into())),
    }
}

async fn scan_to_end<G: StorageGateway>(
    gateway: Arc<G>,
    request: ScanRequest,
    limiter: Option<Arc<Semaphore>>,
    token: CancellationToken,
    accumulator: Arc<ResultAccumulator>,
    counters: Arc<Counters>,
) -> Result<()> {
    let _permit = acquire(limiter, &token).await?;
    counters.scans.fetch_add(1, Ordering::Relaxed);

    let mut next = None;
    loop {
        if token.is_cancelled() {
            return Err(GeoError::Cancelled);
        }
        let page = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(GeoError::Cancelled),
            page = gateway.scan_range(&request, next.take()) => page?,
        };
        counters.pages.fetch_add(1, Ordering::Relaxed);

        accumulator.append(page.items);
        match page.next {
            Some(resume) => next = Some(resume),
            None => return Ok(()),
        }
    }
}
