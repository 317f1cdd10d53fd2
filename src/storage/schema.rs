//! Table schema for the geo index.
//!
//! ```text
//! Table: <table_name>
//!
//! Primary Key:
//!   - hashKey  (Number, Partition Key): leading bits of the cell id
//!   - rangeKey (String, Sort Key): caller-chosen item id
//!
//! Attributes:
//!   - geohash: Number - S2 leaf cell id of the point
//!   - geoJson: String - GeoJSON Point payload
//!   - any caller attributes
//!
//! Local Secondary Index <geohash-index>:
//!   - hashKey (Partition Key), geohash (Sort Key), projection ALL
//! ```
//!
//! The secondary index is what makes cell-id range scans possible; primary
//! sort-key order says nothing about location.

use crate::config::GeoConfig;

/// Default partition key attribute.
pub const DEFAULT_HASH_KEY_ATTRIBUTE: &str = "hashKey";

/// Default sort key attribute.
pub const DEFAULT_RANGE_KEY_ATTRIBUTE: &str = "rangeKey";

/// Default cell id attribute.
pub const DEFAULT_GEOHASH_ATTRIBUTE: &str = "geohash";

/// Default payload attribute.
pub const DEFAULT_GEOJSON_ATTRIBUTE: &str = "geoJson";

/// Default secondary index name.
pub const DEFAULT_GEOHASH_INDEX: &str = "geohash-index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Number,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl KeyAttribute {
    fn number(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Number,
        }
    }

    fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::String,
        }
    }
}

/// Secondary index sharing the table's partition key, sorted by cell id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub hash_key: KeyAttribute,
    pub range_key: KeyAttribute,
}

/// Everything a store needs to create or validate the geo table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub hash_key: KeyAttribute,
    pub range_key: KeyAttribute,
    pub geohash_index: IndexSchema,
    /// Attribute holding the GeoJSON payload; not part of any key.
    pub geojson_attribute: String,
}

impl TableSchema {
    pub fn from_config(config: &GeoConfig) -> Self {
        let hash_key = KeyAttribute::number(&config.hash_key_attribute_name);
        Self {
            table_name: config.table_name.clone(),
            hash_key: hash_key.clone(),
            range_key: KeyAttribute::string(&config.range_key_attribute_name),
            geohash_index: IndexSchema {
                name: config.geohash_index_name.clone(),
                hash_key,
                range_key: KeyAttribute::number(&config.geohash_attribute_name),
            },
            geojson_attribute: config.geojson_attribute_name.clone(),
        }
    }

    /// Attribute names the index always needs back from a scan.
    pub fn required_attributes(&self) -> [&str; 4] {
        [
            &self.hash_key.name,
            &self.range_key.name,
            &self.geohash_index.range_key.name,
            &self.geojson_attribute,
        ]
    }
}
