//! Request and result types for [`GeoService`](super::GeoService) operations.

use crate::compute::cell::CellId;
use crate::compute::filter::GeoItem;
use crate::storage::item::{AttributeValue, Item, ItemKey};
use geoscan_types::point::GeoPoint;
use geoscan_types::region::QueryRegion;
use std::time::Duration;

/// Store a point under a caller-chosen range key.
#[derive(Debug, Clone, PartialEq)]
pub struct PutPointRequest {
    pub point: GeoPoint,
    pub range_key: String,
    /// Extra attributes stored alongside the point. Entries named like the
    /// key, cell or payload attributes are overwritten.
    pub attributes: Item,
}

impl PutPointRequest {
    pub fn new(point: GeoPoint, range_key: impl Into<String>) -> Self {
        Self {
            point,
            range_key: range_key.into(),
            attributes: Item::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Where a point was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutPointResult {
    pub key: ItemKey,
    pub cell_id: CellId,
}

/// Read back one stored point.
#[derive(Debug, Clone, PartialEq)]
pub struct GetPointRequest {
    pub point: GeoPoint,
    pub range_key: String,
    pub attributes_to_fetch: Option<Vec<String>>,
}

impl GetPointRequest {
    pub fn new(point: GeoPoint, range_key: impl Into<String>) -> Self {
        Self {
            point,
            range_key: range_key.into(),
            attributes_to_fetch: None,
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes_to_fetch = Some(attributes);
        self
    }
}

/// A region query with an optional projection and deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub region: QueryRegion,
    /// Caller attributes to return. The key, cell and payload attributes are
    /// always included. `None` returns whole items.
    pub attributes_to_fetch: Option<Vec<String>>,
    /// Overrides the configured query timeout.
    pub timeout: Option<Duration>,
}

impl QueryRequest {
    pub fn new(region: QueryRegion) -> Self {
        Self {
            region,
            attributes_to_fetch: None,
            timeout: None,
        }
    }

    pub fn rectangle(min: GeoPoint, max: GeoPoint) -> Self {
        Self::new(QueryRegion::rectangle(min, max))
    }

    pub fn circle(center: GeoPoint, radius_meters: f64) -> Self {
        Self::new(QueryRegion::circle(center, radius_meters))
    }

    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes_to_fetch = Some(attributes);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Items inside the query region, in no particular order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub items: Vec<GeoItem>,
    /// Candidates returned by the store before exact filtering.
    pub raw_count: usize,
    /// Number of partition scans issued.
    pub scan_count: usize,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn points(&self) -> Vec<GeoPoint> {
        self.items.iter().map(|item| item.point).collect()
    }

    /// Range keys of the result items, skipping any that were projected away.
    pub fn range_keys<'a>(&'a self, range_key_attribute: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.items
            .iter()
            .filter_map(move |item| item.item.get(range_key_attribute).and_then(AttributeValue::as_str))
    }
}

/// Lifecycle of a single query, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Covering,
    Dispatching,
    Collecting,
    Filtering,
    Done,
    Failed,
}

/// Counters for service operations since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub puts: u64,
    pub gets: u64,
    pub queries: u64,
    pub failed_queries: u64,
    /// Partition scans issued across all queries
    pub scans: u64,
    /// Scan pages fetched across all queries
    pub pages: u64,
}
