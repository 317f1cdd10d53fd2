//! Query orchestration over a [`StorageGateway`].
//!
//! [`GeoService`] is the entry point for writing points and running region
//! queries. A query goes through a fixed pipeline:
//!
//! 1. cover the region with S2 cell-id ranges,
//! 2. merge the ranges and split them at partition boundaries,
//! 3. scan every partition range concurrently, following pagination,
//! 4. filter the candidates to the points the region actually contains.
//!
//! Region and point errors fail the call before any scan is issued. Once
//! scans are dispatched, any failure (storage, cancellation, deadline,
//! corrupt payload) is reported as [`GeoError::QueryFailed`] carrying the
//! first cause, and no partial result is returned.

use crate::compute::cell::{cell_of, cover_region, shard_key_of};
use crate::compute::filter::{GeoItem, ResultFilter};
use crate::compute::range::{ShardRange, plan_scans};
use crate::config::GeoConfig;
use crate::error::{GeoError, Result};
use crate::storage::item::{AttributeValue, ItemKey, decode_point, encode_point, string_attribute};
use crate::storage::schema::TableSchema;
use crate::storage::StorageGateway;
use geoscan_types::point::GeoPoint;
use geoscan_types::region::QueryRegion;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod dispatch;
mod request;

#[cfg(feature = "sync")]
mod sync;

pub use request::{
    GetPointRequest, PutPointRequest, PutPointResult, QueryPhase, QueryRequest, QueryResult,
    ServiceStats,
};

#[cfg(feature = "sync")]
pub use sync::SyncGeoService;

use dispatch::ScanDispatcher;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    puts: AtomicU64,
    gets: AtomicU64,
    queries: AtomicU64,
    failed_queries: AtomicU64,
    scans: AtomicU64,
    pages: AtomicU64,
}

/// Geospatial index over a partitioned key-value store.
///
/// Cloning is cheap; clones share the gateway and statistics.
///
/// # Examples
///
/// ```rust
/// use geoscan::{GeoPoint, GeoServiceBuilder, PutPointRequest};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> geoscan::Result<()> {
/// let service = GeoServiceBuilder::new("places").build_in_memory()?;
///
/// let nyc = GeoPoint::new(40.7128, -74.0060);
/// service.put_point(PutPointRequest::new(nyc, "nyc")).await?;
///
/// let found = service
///     .query_rectangle(GeoPoint::new(40.70, -74.02), GeoPoint::new(40.73, -73.99), None)
///     .await?;
/// assert_eq!(found.points(), vec![nyc]);
/// # Ok(())
/// # }
/// ```
pub struct GeoService<G> {
    config: Arc<GeoConfig>,
    schema: Arc<TableSchema>,
    gateway: Arc<G>,
    counters: Arc<Counters>,
}

impl<G> Clone for GeoService<G> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            schema: Arc::clone(&self.schema),
            gateway: Arc::clone(&self.gateway),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<G: StorageGateway + 'static> GeoService<G> {
    /// Create a service over `gateway`, rejecting an invalid configuration.
    pub fn new(config: GeoConfig, gateway: Arc<G>) -> Result<Self> {
        config.validate().map_err(GeoError::InvalidConfig)?;
        let schema = TableSchema::from_config(&config);
        Ok(Self {
            config: Arc::new(config),
            schema: Arc::new(schema),
            gateway,
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn config(&self) -> &GeoConfig {
        &self.config
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Primary key a point is stored under for `range_key`.
    pub fn key_for(&self, point: &GeoPoint, range_key: impl Into<String>) -> Result<ItemKey> {
        let cell = cell_of(point)?;
        Ok(ItemKey::new(
            shard_key_of(cell, self.config.hash_key_length),
            range_key,
        ))
    }

    /// Store a point, overwriting any item with the same key.
    pub async fn put_point(&self, request: PutPointRequest) -> Result<PutPointResult> {
        if request.range_key.is_empty() {
            return Err(GeoError::InvalidInput("range key must not be empty".into()));
        }
        let cell_id = cell_of(&request.point)?;
        let key = ItemKey::new(
            shard_key_of(cell_id, self.config.hash_key_length),
            request.range_key,
        );

        let mut item = request.attributes;
        item.insert(
            self.config.geohash_attribute_name.clone(),
            AttributeValue::number(cell_id),
        );
        item.insert(
            self.config.geojson_attribute_name.clone(),
            AttributeValue::string(encode_point(&request.point)?),
        );

        self.gateway.put(&key, item).await?;
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        log::trace!("stored {} at {} (cell {})", key, request.point, cell_id);

        Ok(PutPointResult { key, cell_id })
    }

    /// Read one stored point by its location and range key.
    pub async fn get_point(&self, request: GetPointRequest) -> Result<Option<GeoItem>> {
        let key = self.key_for(&request.point, request.range_key)?;
        let projection = self.projection(request.attributes_to_fetch);

        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        let Some(item) = self.gateway.get(&key, projection.as_deref()).await? else {
            return Ok(None);
        };

        let point = decode_point(string_attribute(&item, &self.config.geojson_attribute_name)?)?;
        Ok(Some(GeoItem { point, item }))
    }

    /// Points inside the closed rectangle spanned by `min` and `max`.
    pub async fn query_rectangle(
        &self,
        min: GeoPoint,
        max: GeoPoint,
        attributes_to_fetch: Option<Vec<String>>,
    ) -> Result<QueryResult> {
        let mut request = QueryRequest::rectangle(min, max);
        request.attributes_to_fetch = attributes_to_fetch;
        self.query(request).await
    }

    /// Points within `radius_meters` of `center`.
    pub async fn query_circle(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        attributes_to_fetch: Option<Vec<String>>,
    ) -> Result<QueryResult> {
        let mut request = QueryRequest::circle(center, radius_meters);
        request.attributes_to_fetch = attributes_to_fetch;
        self.query(request).await
    }

    pub async fn query(&self, request: QueryRequest) -> Result<QueryResult> {
        self.query_with_cancel(request, &CancellationToken::new()).await
    }

    /// Run a query that stops early when `cancel` fires.
    ///
    /// Cancellation and the deadline both surface as
    /// [`GeoError::QueryFailed`] wrapping [`GeoError::Cancelled`].
    pub async fn query_with_cancel(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResult> {
        let query_id = self.counters.queries.fetch_add(1, Ordering::Relaxed);
        let kind = request.region.kind();

        log::debug!("query {} ({:?}): {:?}", query_id, kind, QueryPhase::Covering);
        let plan = match self.plan(&request.region) {
            Ok(plan) => plan,
            Err(e) => {
                self.counters.failed_queries.fetch_add(1, Ordering::Relaxed);
                log::debug!("query {} ({:?}): {:?}: {}", query_id, kind, QueryPhase::Failed, e);
                return Err(e);
            }
        };
        let scan_count = plan.len();

        let token = cancel.child_token();
        // Cancels the watchdog and any scans left behind if this future is dropped.
        let _guard = token.clone().drop_guard();
        if let Some(deadline) = request.timeout.or(self.config.query_timeout()) {
            spawn_deadline(query_id, deadline, token.clone());
        }

        log::debug!(
            "query {} ({:?}): {:?} {} scans",
            query_id,
            kind,
            QueryPhase::Dispatching,
            scan_count
        );
        let dispatcher = ScanDispatcher::new(
            Arc::clone(&self.gateway),
            self.projection(request.attributes_to_fetch),
            self.config.max_concurrent_scans,
            token,
            Arc::clone(&self.counters),
        );

        log::debug!("query {} ({:?}): {:?}", query_id, kind, QueryPhase::Collecting);
        let outcome = dispatcher.run(plan).await.and_then(|raw| {
            log::debug!("query {} ({:?}): {:?} {} candidates", query_id, kind, QueryPhase::Filtering, raw.len());
            let raw_count = raw.len();
            let items = ResultFilter::new(&request.region, &self.config.geojson_attribute_name).apply(raw)?;
            Ok(QueryResult {
                items,
                raw_count,
                scan_count,
            })
        });

        match outcome {
            Ok(result) => {
                log::debug!(
                    "query {} ({:?}): {:?} {} of {} candidates kept",
                    query_id,
                    kind,
                    QueryPhase::Done,
                    result.items.len(),
                    result.raw_count
                );
                Ok(result)
            }
            Err(e) => {
                self.counters.failed_queries.fetch_add(1, Ordering::Relaxed);
                log::warn!("query {} ({:?}): {:?}: {}", query_id, kind, QueryPhase::Failed, e);
                Err(GeoError::query_failed(e))
            }
        }
    }

    /// Partition scans a query over `region` would issue.
    pub fn plan(&self, region: &QueryRegion) -> Result<Vec<ShardRange>> {
        let ranges = cover_region(region, &self.config.covering)?;
        Ok(plan_scans(ranges, self.config.hash_key_length))
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            puts: self.counters.puts.load(Ordering::Relaxed),
            gets: self.counters.gets.load(Ordering::Relaxed),
            queries: self.counters.queries.load(Ordering::Relaxed),
            failed_queries: self.counters.failed_queries.load(Ordering::Relaxed),
            scans: self.counters.scans.load(Ordering::Relaxed),
            pages: self.counters.pages.load(Ordering::Relaxed),
        }
    }

    /// Store projection for the caller's attributes plus the ones the index needs.
    fn projection(&self, attributes: Option<Vec<String>>) -> Option<Vec<String>> {
        let mut attributes = attributes?;
        for required in self.schema.required_attributes() {
            if !attributes.iter().any(|name| name == required) {
                attributes.push(required.to_string());
            }
        }
        Some(attributes)
    }
}

fn spawn_deadline(query_id: u64, deadline: Duration, token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                log::warn!("query {} exceeded its {:?} deadline, cancelling", query_id, deadline);
                token.cancel();
            }
        }
    });
}
