//! Configuration for the geo index and its backing table.
//!
//! A [`GeoConfig`] names the table, the attributes the index writes, the
//! secondary index used for cell-id range scans, and the tuning knobs of the
//! query engine. It is handed to [`crate::GeoService`] at construction and
//! never mutated afterwards.

use crate::storage::schema;
use serde::de::Error;
use std::time::Duration;

/// Index and table configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoConfig {
    pub table_name: String,

    #[serde(default = "GeoConfig::default_hash_key_attribute_name")]
    pub hash_key_attribute_name: String,

    #[serde(default = "GeoConfig::default_range_key_attribute_name")]
    pub range_key_attribute_name: String,

    #[serde(default = "GeoConfig::default_geohash_attribute_name")]
    pub geohash_attribute_name: String,

    #[serde(default = "GeoConfig::default_geojson_attribute_name")]
    pub geojson_attribute_name: String,

    #[serde(default = "GeoConfig::default_geohash_index_name")]
    pub geohash_index_name: String,

    /// Number of leading cell-id bits that form the partition key.
    #[serde(default = "GeoConfig::default_hash_key_length")]
    pub hash_key_length: u8,

    #[serde(default)]
    pub covering: CoveringConfig,

    /// Upper bound on shard scans running at once. `None` runs them all.
    #[serde(default)]
    pub max_concurrent_scans: Option<usize>,

    /// Deadline applied to every query, in milliseconds.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

/// Parameters handed to the S2 region coverer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoveringConfig {
    #[serde(default = "CoveringConfig::default_max_cells")]
    pub max_cells: usize,

    #[serde(default)]
    pub min_level: u8,

    #[serde(default = "CoveringConfig::default_max_level")]
    pub max_level: u8,
}

impl CoveringConfig {
    const fn default_max_cells() -> usize {
        8
    }

    const fn default_max_level() -> u8 {
        crate::compute::cell::MAX_LEVEL
    }
}

impl Default for CoveringConfig {
    fn default() -> Self {
        Self {
            max_cells: Self::default_max_cells(),
            min_level: 0,
            max_level: Self::default_max_level(),
        }
    }
}

impl GeoConfig {
    pub const DEFAULT_HASH_KEY_LENGTH: u8 = 6;
    pub const MAX_HASH_KEY_LENGTH: u8 = 32;

    /// Configuration with default attribute names for `table_name`.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            hash_key_attribute_name: Self::default_hash_key_attribute_name(),
            range_key_attribute_name: Self::default_range_key_attribute_name(),
            geohash_attribute_name: Self::default_geohash_attribute_name(),
            geojson_attribute_name: Self::default_geojson_attribute_name(),
            geohash_index_name: Self::default_geohash_index_name(),
            hash_key_length: Self::default_hash_key_length(),
            covering: CoveringConfig::default(),
            max_concurrent_scans: None,
            query_timeout_ms: None,
        }
    }

    fn default_hash_key_attribute_name() -> String {
        schema::DEFAULT_HASH_KEY_ATTRIBUTE.to_string()
    }

    fn default_range_key_attribute_name() -> String {
        schema::DEFAULT_RANGE_KEY_ATTRIBUTE.to_string()
    }

    fn default_geohash_attribute_name() -> String {
        schema::DEFAULT_GEOHASH_ATTRIBUTE.to_string()
    }

    fn default_geojson_attribute_name() -> String {
        schema::DEFAULT_GEOJSON_ATTRIBUTE.to_string()
    }

    fn default_geohash_index_name() -> String {
        schema::DEFAULT_GEOHASH_INDEX.to_string()
    }

    const fn default_hash_key_length() -> u8 {
        Self::DEFAULT_HASH_KEY_LENGTH
    }

    pub fn with_hash_key_length(mut self, length: u8) -> Self {
        self.hash_key_length = length;
        self
    }

    pub fn with_covering(mut self, covering: CoveringConfig) -> Self {
        self.covering = covering;
        self
    }

    pub fn with_max_concurrent_scans(mut self, limit: usize) -> Self {
        assert!(limit > 0, "Scan concurrency must be greater than zero");
        self.max_concurrent_scans = Some(limit);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_attribute_names(
        mut self,
        hash_key: impl Into<String>,
        range_key: impl Into<String>,
        geohash: impl Into<String>,
        geojson: impl Into<String>,
    ) -> Self {
        self.hash_key_attribute_name = hash_key.into();
        self.range_key_attribute_name = range_key.into();
        self.geohash_attribute_name = geohash.into();
        self.geojson_attribute_name = geojson.into();
        self
    }

    pub fn with_geohash_index_name(mut self, name: impl Into<String>) -> Self {
        self.geohash_index_name = name.into();
        self
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// Attribute names the engine writes itself and never takes from callers.
    pub fn reserved_attributes(&self) -> [&str; 4] {
        [
            &self.hash_key_attribute_name,
            &self.range_key_attribute_name,
            &self.geohash_attribute_name,
            &self.geojson_attribute_name,
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.table_name.is_empty() {
            return Err("Table name must not be empty".to_string());
        }

        if self.hash_key_length == 0 || self.hash_key_length > Self::MAX_HASH_KEY_LENGTH {
            return Err(format!(
                "Hash key length must be in 1..={}, got {}",
                Self::MAX_HASH_KEY_LENGTH,
                self.hash_key_length
            ));
        }

        let names = self.reserved_attributes();
        for (idx, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err("Attribute names must not be empty".to_string());
            }
            if names[idx + 1..].contains(name) {
                return Err(format!("Attribute name '{}' is used twice", name));
            }
        }

        if self.geohash_index_name.is_empty() {
            return Err("Geohash index name must not be empty".to_string());
        }

        let covering = &self.covering;
        if covering.max_cells == 0 {
            return Err("Covering max_cells must be greater than zero".to_string());
        }
        if covering.min_level > covering.max_level
            || covering.max_level > crate::compute::cell::MAX_LEVEL
        {
            return Err(format!(
                "Covering levels must satisfy min <= max <= {}, got {}..{}",
                crate::compute::cell::MAX_LEVEL,
                covering.min_level,
                covering.max_level
            ));
        }

        if self.max_concurrent_scans == Some(0) {
            return Err("Scan concurrency must be greater than zero".to_string());
        }

        if self.hash_key_length > 16 {
            log::warn!(
                "Hash key length of {} bits spreads nearby points over many partitions; \
                queries will fan out to more shard scans.",
                self.hash_key_length
            );
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: GeoConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: GeoConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GeoConfig::new("points");
        assert_eq!(config.hash_key_attribute_name, "hashKey");
        assert_eq!(config.range_key_attribute_name, "rangeKey");
        assert_eq!(config.geohash_attribute_name, "geohash");
        assert_eq!(config.geojson_attribute_name, "geoJson");
        assert_eq!(config.geohash_index_name, "geohash-index");
        assert_eq!(config.hash_key_length, 6);
        assert_eq!(config.covering.max_cells, 8);
        assert!(config.query_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_defaults_fill_in() {
        let config = GeoConfig::from_json(r#"{"table_name": "places"}"#).unwrap();
        assert_eq!(config, GeoConfig::new("places"));
    }

    #[test]
    fn test_config_serialization() {
        let config = GeoConfig::new("points")
            .with_hash_key_length(8)
            .with_max_concurrent_scans(4)
            .with_query_timeout(Duration::from_millis(1500));

        let json = config.to_json().unwrap();
        let deserialized = GeoConfig::from_json(&json).unwrap();

        assert_eq!(deserialized.hash_key_length, 8);
        assert_eq!(deserialized.max_concurrent_scans, Some(4));
        assert_eq!(deserialized.query_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_query_timeout_saturates() {
        let config = GeoConfig::new("t").with_query_timeout(Duration::MAX);
        assert_eq!(config.query_timeout_ms, Some(u64::MAX));
        assert_eq!(config.query_timeout(), Some(Duration::from_millis(u64::MAX)));
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(GeoConfig::from_json(r#"{"table_name": "t", "bogus": 1}"#).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(GeoConfig::new("").validate().is_err());
        assert!(GeoConfig::new("t").with_hash_key_length(0).validate().is_err());
        assert!(GeoConfig::new("t").with_hash_key_length(33).validate().is_err());

        let duplicate = GeoConfig::new("t").with_attribute_names("k", "k", "cell", "json");
        assert!(duplicate.validate().is_err());

        let bad_levels = GeoConfig::new("t").with_covering(CoveringConfig {
            max_cells: 8,
            min_level: 12,
            max_level: 4,
        });
        assert!(bad_levels.validate().is_err());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml_roundtrip() {
        let config = GeoConfig::new("points").with_hash_key_length(5);
        let text = config.to_toml().unwrap();
        assert_eq!(GeoConfig::from_toml(&text).unwrap(), config);
    }
}
