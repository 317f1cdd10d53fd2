//! Blocking wrapper for callers without an async runtime.
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! geoscan = { version = "0.1", features = ["sync"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use geoscan::{GeoPoint, GeoServiceBuilder, PutPointRequest, SyncGeoService};
//! use std::thread;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = SyncGeoService::new(GeoServiceBuilder::new("places").build_in_memory()?)?;
//!
//! let writer = service.clone();
//! let handle = thread::spawn(move || {
//!     writer
//!         .put_point(PutPointRequest::new(GeoPoint::new(52.5200, 13.4050), "berlin"))
//!         .map(|_| ())
//! });
//! handle.join().unwrap()?;
//!
//! let found = service.query_circle(GeoPoint::new(52.52, 13.40), 2_000.0, None)?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

use super::{
    GeoService, GetPointRequest, PutPointRequest, PutPointResult, QueryRequest, QueryResult,
    ServiceStats,
};
use crate::compute::filter::GeoItem;
use crate::error::Result;
use crate::storage::StorageGateway;
use geoscan_types::point::GeoPoint;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Thread-safe blocking handle around a [`GeoService`].
///
/// Owns a multi-threaded runtime shared by all clones. Must not be called
/// from inside another async runtime.
pub struct SyncGeoService<G> {
    runtime: Arc<Runtime>,
    inner: GeoService<G>,
}

impl<G> Clone for SyncGeoService<G> {
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
            inner: self.inner.clone(),
        }
    }
}

impl<G: StorageGateway + 'static> SyncGeoService<G> {
    pub fn new(inner: GeoService<G>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("geoscan-worker")
            .enable_time()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
            inner,
        })
    }

    /// The wrapped async service.
    pub fn inner(&self) -> &GeoService<G> {
        &self.inner
    }

    pub fn put_point(&self, request: PutPointRequest) -> Result<PutPointResult> {
        self.runtime.block_on(self.inner.put_point(request))
    }

    pub fn get_point(&self, request: GetPointRequest) -> Result<Option<GeoItem>> {
        self.runtime.block_on(self.inner.get_point(request))
    }

    pub fn query_rectangle(
        &self,
        min: GeoPoint,
        max: GeoPoint,
        attributes_to_fetch: Option<Vec<String>>,
    ) -> Result<QueryResult> {
        self.runtime
            .block_on(self.inner.query_rectangle(min, max, attributes_to_fetch))
    }

    pub fn query_circle(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        attributes_to_fetch: Option<Vec<String>>,
    ) -> Result<QueryResult> {
        self.runtime
            .block_on(self.inner.query_circle(center, radius_meters, attributes_to_fetch))
    }

    pub fn query(&self, request: QueryRequest) -> Result<QueryResult> {
        self.runtime.block_on(self.inner.query(request))
    }

    pub fn stats(&self) -> ServiceStats {
        self.inner.stats()
    }
}
