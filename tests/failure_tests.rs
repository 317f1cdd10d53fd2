use async_trait::async_trait;
use geoscan::storage::StorageGateway;
use geoscan::{
    AttributeValue, CancellationToken, GeoConfig, GeoError, GeoPoint, GeoService,
    GeoServiceBuilder, Item, ItemKey, MemoryGateway, PageToken, PutPointRequest, QueryRegion,
    QueryRequest, ScanPage, ScanRequest, TableSchema,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Gateway double that can fail, stall, or corrupt scans of chosen partitions.
struct FaultyGateway {
    inner: MemoryGateway,
    failing_shards: Mutex<HashSet<u64>>,
    corrupt_shards: Mutex<HashSet<u64>>,
    scan_delay: Option<Duration>,
    scans_started: AtomicUsize,
    scans_finished: AtomicUsize,
}

impl FaultyGateway {
    fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            failing_shards: Mutex::new(HashSet::new()),
            corrupt_shards: Mutex::new(HashSet::new()),
            scan_delay: None,
            scans_started: AtomicUsize::new(0),
            scans_finished: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = Some(delay);
        self
    }
}

#[async_trait]
impl StorageGateway for FaultyGateway {
    async fn put(&self, key: &ItemKey, item: Item) -> geoscan::Result<()> {
        self.inner.put(key, item).await
    }

    async fn get(&self, key: &ItemKey, projection: Option<&[String]>) -> geoscan::Result<Option<Item>> {
        self.inner.get(key, projection).await
    }

    async fn scan_range(&self, request: &ScanRequest, page: Option<PageToken>) -> geoscan::Result<ScanPage> {
        self.scans_started.fetch_add(1, Ordering::SeqCst);
        if self.failing_shards.lock().contains(&request.hash_key) {
            return Err(GeoError::storage_unavailable(format!(
                "partition {} throttled",
                request.hash_key
            )));
        }
        if let Some(delay) = self.scan_delay {
            tokio::time::sleep(delay).await;
        }

        let mut result = self.inner.scan_range(request, page).await?;
        if self.corrupt_shards.lock().contains(&request.hash_key) {
            for item in &mut result.items {
                item.insert("geoJson".into(), AttributeValue::from("{\"type\":\"Polygon\"}"));
            }
        }
        self.scans_finished.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}

/// A region spanning three cube faces, so queries always fan out.
fn wide_region() -> QueryRegion {
    QueryRegion::rectangle(GeoPoint::new(-10.0, -60.0), GeoPoint::new(10.0, 60.0))
}

async fn seeded(gateway: FaultyGateway) -> GeoService<FaultyGateway> {
    let _ = env_logger::builder().is_test(true).try_init();
    let service = GeoServiceBuilder::new("places")
        .build_with_gateway(Arc::new(gateway))
        .unwrap();
    for lng in (-55..=55).step_by(5) {
        let point = GeoPoint::new(0.0, lng as f64);
        service
            .put_point(PutPointRequest::new(point, format!("lng{lng}")))
            .await
            .unwrap();
    }
    service
}

fn memory() -> MemoryGateway {
    MemoryGateway::new(TableSchema::from_config(&GeoConfig::new("places")))
}

#[tokio::test]
async fn test_healthy_fan_out_returns_everything() {
    let service = seeded(FaultyGateway::new(memory())).await;
    let plan = service.plan(&wide_region()).unwrap();
    assert!(plan.len() >= 2);

    let result = service.query(QueryRequest::new(wide_region())).await.unwrap();
    assert_eq!(result.len(), 23);
    assert_eq!(result.scan_count, plan.len());
}

#[tokio::test]
async fn test_one_failing_partition_fails_whole_query() {
    let service = seeded(FaultyGateway::new(memory())).await;
    let plan = service.plan(&wide_region()).unwrap();
    assert!(plan.len() >= 2);
    service.gateway().failing_shards.lock().insert(plan[0].shard);

    let err = service.query(QueryRequest::new(wide_region())).await.unwrap_err();
    assert!(matches!(err, GeoError::QueryFailed { .. }));
    assert!(matches!(err.root_cause(), GeoError::StorageUnavailable(_)));
    assert!(err.is_retryable());

    let stats = service.stats();
    assert_eq!(stats.failed_queries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failing_partition_cancels_stalled_siblings() {
    let service = seeded(FaultyGateway::new(memory()).with_delay(Duration::from_secs(3600))).await;
    let plan = service.plan(&wide_region()).unwrap();
    assert!(plan.len() >= 2);
    service.gateway().failing_shards.lock().insert(plan[0].shard);

    let started = tokio::time::Instant::now();
    let err = service.query(QueryRequest::new(wide_region())).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(err, GeoError::QueryFailed { .. }));
    assert!(matches!(err.root_cause(), GeoError::StorageUnavailable(_)));
    assert_eq!(service.gateway().scans_finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failure_is_reported_with_bounded_concurrency() {
    let gateway = FaultyGateway::new(memory());
    let service = GeoServiceBuilder::new("places")
        .max_concurrent_scans(1)
        .build_with_gateway(Arc::new(gateway))
        .unwrap();
    service
        .put_point(PutPointRequest::new(GeoPoint::new(0.0, 0.0), "origin"))
        .await
        .unwrap();

    let plan = service.plan(&wide_region()).unwrap();
    for scan in &plan {
        service.gateway().failing_shards.lock().insert(scan.shard);
    }

    let err = service.query(QueryRequest::new(wide_region())).await.unwrap_err();
    assert!(matches!(err, GeoError::QueryFailed { .. }));
    assert!(matches!(err.root_cause(), GeoError::StorageUnavailable(_)));
    assert_eq!(service.stats().failed_queries, 1);
}

#[tokio::test]
async fn test_corrupt_payload_fails_query() {
    let service = seeded(FaultyGateway::new(memory())).await;
    let plan = service.plan(&wide_region()).unwrap();
    let shard = service.key_for(&GeoPoint::new(0.0, 0.0), "x").unwrap().hash_key;
    assert!(plan.iter().any(|scan| scan.shard == shard));
    service.gateway().corrupt_shards.lock().insert(shard);

    let err = service.query(QueryRequest::new(wide_region())).await.unwrap_err();
    assert!(matches!(err.root_cause(), GeoError::CorruptItem(_)));
    assert!(!err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_query() {
    let service = seeded(FaultyGateway::new(memory()).with_delay(Duration::from_secs(30))).await;

    let request = QueryRequest::new(wide_region()).with_timeout(Duration::from_secs(1));
    let err = service.query(request).await.unwrap_err();

    assert!(matches!(err, GeoError::QueryFailed { .. }));
    assert!(matches!(err.root_cause(), GeoError::Cancelled));
    assert_eq!(service.gateway().scans_finished.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_applies_by_default() {
    let gateway = FaultyGateway::new(memory()).with_delay(Duration::from_secs(30));
    let service = GeoServiceBuilder::new("places")
        .query_timeout(Duration::from_millis(200))
        .build_with_gateway(Arc::new(gateway))
        .unwrap();

    let err = service.query(QueryRequest::new(wide_region())).await.unwrap_err();
    assert!(matches!(err.root_cause(), GeoError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_caller_cancellation_stops_scans() {
    let service = seeded(FaultyGateway::new(memory()).with_delay(Duration::from_secs(10))).await;
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let err = service
        .query_with_cancel(QueryRequest::new(wide_region()), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), GeoError::Cancelled));
    assert_eq!(service.gateway().scans_finished.load(Ordering::SeqCst), 0);

    // Later queries with a fresh token are unaffected.
    let result = service.query(QueryRequest::new(wide_region())).await.unwrap();
    assert_eq!(result.len(), 23);
}

#[tokio::test]
async fn test_invalid_region_is_not_wrapped() {
    let service = seeded(FaultyGateway::new(memory())).await;
    let err = service
        .query_rectangle(GeoPoint::new(5.0, 10.0), GeoPoint::new(-5.0, 20.0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GeoError::InvalidRegion(_)));
    assert_eq!(service.gateway().scans_started.load(Ordering::SeqCst), 0);
}
