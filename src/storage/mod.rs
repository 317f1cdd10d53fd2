//! Storage gateway abstraction for the backing key-value store.
//!
//! The query engine only needs three things from a store: single-item
//! upsert, single-item consistent read, and a paginated range scan over the
//! cell-id secondary index within one partition. Any store offering those
//! (a cloud document table, an embedded ordered map, a test double) can back
//! the index by implementing [`StorageGateway`].

use crate::compute::cell::{CellId, ShardKey};
use crate::compute::range::GeohashRange;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod item;
mod memory;
pub mod schema;

pub use item::{AttributeValue, Item, ItemKey};
pub use memory::MemoryGateway;
pub use schema::TableSchema;

/// Trait for backing store implementations.
///
/// Implementations must not retry internally: a transient failure is
/// reported as [`crate::GeoError::StorageUnavailable`] and the caller decides.
/// Reads and scans must be strongly consistent, observing every write that
/// completed before the call began.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Insert or overwrite the item stored under `key`.
    ///
    /// The key attributes are written from `key`, replacing any values of the
    /// same names in `item`.
    async fn put(&self, key: &ItemKey, item: Item) -> Result<()>;

    /// Read one item, optionally restricted to the `projection` attributes.
    async fn get(&self, key: &ItemKey, projection: Option<&[String]>) -> Result<Option<Item>>;

    /// Fetch one page of items in partition `request.hash_key` whose cell id
    /// lies inside `request.range`, ordered by `(cell id, range key)`.
    ///
    /// Pass `None` for the first page and the returned `next` token for each
    /// following page, until `next` is `None`.
    async fn scan_range(&self, request: &ScanRequest, page: Option<PageToken>) -> Result<ScanPage>;
}

#[async_trait]
impl<G: StorageGateway + ?Sized> StorageGateway for Arc<G> {
    async fn put(&self, key: &ItemKey, item: Item) -> Result<()> {
        (**self).put(key, item).await
    }

    async fn get(&self, key: &ItemKey, projection: Option<&[String]>) -> Result<Option<Item>> {
        (**self).get(key, projection).await
    }

    async fn scan_range(&self, request: &ScanRequest, page: Option<PageToken>) -> Result<ScanPage> {
        (**self).scan_range(request, page).await
    }
}

/// One index range scan within a single partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub hash_key: ShardKey,
    pub range: GeohashRange,
    /// Attributes to return; `None` returns whole items.
    pub projection: Option<Vec<String>>,
}

/// Exclusive start key for the next page of an index scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken {
    pub cell_id: CellId,
    pub range_key: String,
}

/// A page of scan results.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Where to resume, or `None` when the scan is complete.
    pub next: Option<PageToken>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Storage backend statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of stored items
    pub item_count: usize,
    /// Number of non-empty partitions
    pub partition_count: usize,
    /// Number of put/get/scan calls served
    pub operations_count: u64,
    /// Number of scan pages returned
    pub pages_served: u64,
}
