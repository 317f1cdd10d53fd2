//! Service builder for flexible configuration
//!
//! Collects table naming, partitioning and query limits, validates them once,
//! and wires a [`GeoService`] to either the in-memory gateway or any
//! caller-supplied [`StorageGateway`].

use crate::config::{CoveringConfig, GeoConfig};
use crate::error::{GeoError, Result};
use crate::service::GeoService;
use crate::storage::{MemoryGateway, StorageGateway, TableSchema};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`GeoService`] instances.
#[derive(Debug, Clone)]
pub struct GeoServiceBuilder {
    config: GeoConfig,
    page_size: Option<usize>,
}

impl GeoServiceBuilder {
    /// Create a builder for `table_name` with default settings.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            config: GeoConfig::new(table_name),
            page_size: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: GeoConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of leading cell-id bits used as the partition key.
    pub fn hash_key_length(mut self, length: u8) -> Self {
        self.config.hash_key_length = length;
        self
    }

    pub fn covering(mut self, covering: CoveringConfig) -> Self {
        self.config.covering = covering;
        self
    }

    /// Bound the number of partition scans in flight per query.
    pub fn max_concurrent_scans(mut self, limit: usize) -> Self {
        self.config.max_concurrent_scans = Some(limit);
        self
    }

    /// Default deadline for queries that do not set their own.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_query_timeout(timeout);
        self
    }

    /// Items per scan page for the in-memory gateway.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn validated(&self) -> Result<()> {
        self.config.validate().map_err(GeoError::InvalidConfig)?;
        if self.page_size == Some(0) {
            return Err(GeoError::InvalidConfig(
                "Page size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Build a service backed by a fresh [`MemoryGateway`].
    pub fn build_in_memory(self) -> Result<GeoService<MemoryGateway>> {
        self.validated()?;
        let mut gateway = MemoryGateway::new(TableSchema::from_config(&self.config));
        if let Some(page_size) = self.page_size {
            gateway = gateway.with_page_size(page_size);
        }
        GeoService::new(self.config, Arc::new(gateway))
    }

    /// Build a service backed by `gateway`.
    pub fn build_with_gateway<G: StorageGateway + 'static>(self, gateway: Arc<G>) -> Result<GeoService<G>> {
        self.validated()?;
        if self.page_size.is_some() {
            log::warn!("page_size only applies to the in-memory gateway; ignoring it");
        }
        GeoService::new(self.config, gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let service = GeoServiceBuilder::new("places").build_in_memory().unwrap();
        assert_eq!(service.config().table_name, "places");
        assert_eq!(service.config().hash_key_length, GeoConfig::DEFAULT_HASH_KEY_LENGTH);
        assert_eq!(service.config().query_timeout(), None);
    }

    #[test]
    fn test_builder_settings_reach_config() {
        let service = GeoServiceBuilder::new("places")
            .hash_key_length(10)
            .max_concurrent_scans(3)
            .query_timeout(Duration::from_millis(1500))
            .build_in_memory()
            .unwrap();

        let config = service.config();
        assert_eq!(config.hash_key_length, 10);
        assert_eq!(config.max_concurrent_scans, Some(3));
        assert_eq!(config.query_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        let bad_length = GeoServiceBuilder::new("places").hash_key_length(33).build_in_memory();
        assert!(matches!(bad_length, Err(GeoError::InvalidConfig(_))));

        let bad_page = GeoServiceBuilder::new("places").page_size(0).build_in_memory();
        assert!(matches!(bad_page, Err(GeoError::InvalidConfig(_))));

        let no_table = GeoServiceBuilder::new("").build_in_memory();
        assert!(matches!(no_table, Err(GeoError::InvalidConfig(_))));

        let no_scans = GeoServiceBuilder::new("places").max_concurrent_scans(0).build_in_memory();
        assert!(matches!(no_scans, Err(GeoError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_with_custom_gateway() {
        let config = GeoConfig::new("shared").with_attribute_names("pk", "sk", "cell", "payload");
        let gateway = Arc::new(MemoryGateway::new(TableSchema::from_config(&config)));
        let service = GeoServiceBuilder::new("ignored")
            .config(config)
            .build_with_gateway(Arc::clone(&gateway))
            .unwrap();
        assert_eq!(service.schema().geohash_index.range_key.name, "cell");
        assert!(Arc::ptr_eq(service.gateway(), &gateway));
    }
}
