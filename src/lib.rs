//! Geospatial point index over partitioned key-value stores.
//!
//! Points are keyed by the S2 cell that contains them and partitioned by the
//! leading bits of that cell id. Rectangle and radius queries are answered by
//! covering the region with cell-id ranges, scanning each affected partition
//! concurrently, and filtering the candidates exactly.
//!
//! ```rust
//! use geoscan::{GeoPoint, GeoServiceBuilder, PutPointRequest};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> geoscan::Result<()> {
//! let service = GeoServiceBuilder::new("landmarks").build_in_memory()?;
//!
//! let eiffel = GeoPoint::new(48.8584, 2.2945);
//! service
//!     .put_point(PutPointRequest::new(eiffel, "eiffel").with_attribute("name", "Eiffel Tower"))
//!     .await?;
//!
//! let nearby = service.query_circle(GeoPoint::new(48.8566, 2.3522), 5_000.0, None).await?;
//! assert_eq!(nearby.points(), vec![eiffel]);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod service;
pub mod storage;

pub use builder::GeoServiceBuilder;
pub use config::{CoveringConfig, GeoConfig};
pub use error::{GeoError, Result};

pub use compute::{CellId, GeoItem, GeohashRange, ResultFilter, ShardKey, ShardRange};

pub use service::{
    GeoService, GetPointRequest, PutPointRequest, PutPointResult, QueryPhase, QueryRequest,
    QueryResult, ServiceStats,
};

#[cfg(feature = "sync")]
pub use service::SyncGeoService;

pub use storage::{
    AttributeValue, Item, ItemKey, MemoryGateway, PageToken, ScanPage, ScanRequest,
    StorageGateway, StorageStats, TableSchema,
};

pub use geo::Point;
pub use geoscan_types::point::GeoPoint;
pub use geoscan_types::region::{QueryRegion, RegionKind};

pub use tokio_util::sync::CancellationToken;

/// Common imports
pub mod prelude {
    pub use crate::{
        GeoConfig, GeoError, GeoPoint, GeoService, GeoServiceBuilder, GetPointRequest,
        PutPointRequest, QueryRegion, QueryRequest, QueryResult, Result, StorageGateway,
    };

    #[cfg(feature = "sync")]
    pub use crate::SyncGeoService;

    pub use crate::CancellationToken;

    pub use std::time::Duration;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
