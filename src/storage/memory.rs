//! In-memory storage gateway.
//!
//! Keeps one primary map per partition plus a per-partition index ordered by
//! `(cell id, range key)`, which is what a store-side secondary index on the
//! cell-id attribute provides. Scans are paginated with a configurable page
//! size so callers see the same continuation behaviour as with a remote store.

use super::item::{AttributeValue, Item, ItemKey};
use super::schema::TableSchema;
use super::{PageToken, ScanPage, ScanRequest, StorageGateway, StorageStats};
use crate::compute::cell::{CellId, ShardKey};
use crate::error::{GeoError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of items returned per scan page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct Partition {
    items: BTreeMap<String, Item>,
    by_cell: BTreeSet<(CellId, String)>,
}

/// In-memory gateway backed by partitioned ordered maps.
pub struct MemoryGateway {
    schema: TableSchema,
    page_size: usize,
    partitions: RwLock<FxHashMap<ShardKey, Partition>>,
    operations: AtomicU64,
    pages: AtomicU64,
}

impl MemoryGateway {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            page_size: DEFAULT_PAGE_SIZE,
            partitions: RwLock::new(FxHashMap::default()),
            operations: AtomicU64::new(0),
            pages: AtomicU64::new(0),
        }
    }

    /// Limit the number of items per scan page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size > 0, "Page size must be greater than zero");
        self.page_size = page_size;
        self
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.partitions.read().values().map(|p| p.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        let partitions = self.partitions.read();
        StorageStats {
            item_count: partitions.values().map(|p| p.items.len()).sum(),
            partition_count: partitions.values().filter(|p| !p.items.is_empty()).count(),
            operations_count: self.operations.load(Ordering::Relaxed),
            pages_served: self.pages.load(Ordering::Relaxed),
        }
    }

    /// Cell id used to index `item`, if it has one.
    fn index_cell(&self, item: &Item) -> Result<Option<CellId>> {
        let name = &self.schema.geohash_index.range_key.name;
        match item.get(name) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                GeoError::InvalidInput(format!(
                    "index key attribute '{}' must be a number, got {:?}",
                    name, value
                ))
            }),
        }
    }

    fn project(item: &Item, projection: Option<&[String]>) -> Item {
        match projection {
            None => item.clone(),
            Some(names) => item
                .iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn put(&self, key: &ItemKey, mut item: Item) -> Result<()> {
        self.operations.fetch_add(1, Ordering::Relaxed);

        item.insert(
            self.schema.hash_key.name.clone(),
            AttributeValue::number(key.hash_key),
        );
        item.insert(
            self.schema.range_key.name.clone(),
            AttributeValue::string(key.range_key.clone()),
        );
        let cell = self.index_cell(&item)?;

        let mut partitions = self.partitions.write();
        let partition = partitions.entry(key.hash_key).or_default();

        if let Some(old) = partition.items.get(&key.range_key)
            && let Ok(Some(old_cell)) = self.index_cell(old)
        {
            partition.by_cell.remove(&(old_cell, key.range_key.clone()));
        }
        if let Some(cell) = cell {
            partition.by_cell.insert((cell, key.range_key.clone()));
        }
        partition.items.insert(key.range_key.clone(), item);

        Ok(())
    }

    async fn get(&self, key: &ItemKey, projection: Option<&[String]>) -> Result<Option<Item>> {
        self.operations.fetch_add(1, Ordering::Relaxed);

        let partitions = self.partitions.read();
        Ok(partitions
            .get(&key.hash_key)
            .and_then(|p| p.items.get(&key.range_key))
            .map(|item| Self::project(item, projection)))
    }

    async fn scan_range(&self, request: &ScanRequest, page: Option<PageToken>) -> Result<ScanPage> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.pages.fetch_add(1, Ordering::Relaxed);

        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(&request.hash_key) else {
            return Ok(ScanPage::default());
        };

        let start = match page {
            Some(token) => Bound::Excluded((token.cell_id, token.range_key)),
            None => Bound::Included((request.range.range_min(), String::new())),
        };

        let mut matching = partition
            .by_cell
            .range((start, Bound::Unbounded))
            .take_while(|(cell, _)| *cell <= request.range.range_max());

        let mut items = Vec::new();
        let mut last_key = None;
        for (cell, range_key) in matching.by_ref().take(self.page_size) {
            if let Some(item) = partition.items.get(range_key) {
                items.push(Self::project(item, request.projection.as_deref()));
            }
            last_key = Some((*cell, range_key.clone()));
        }

        let next = match (matching.next(), last_key) {
            (Some(_), Some((cell_id, range_key))) => Some(PageToken { cell_id, range_key }),
            _ => None,
        };

        log::trace!(
            "scan of partition {} range {} returned {} items (more: {})",
            request.hash_key,
            request.range,
            items.len(),
            next.is_some()
        );

        Ok(ScanPage { items, next })
    }
}
