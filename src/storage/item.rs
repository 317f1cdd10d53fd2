//! Stored item representation and the GeoJSON point payload codec.

use crate::compute::cell::ShardKey;
use crate::error::{GeoError, Result};
use geoscan_types::point::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed attribute value, modelled on the wire types of partitioned
/// document stores: numbers travel as their decimal string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    pub fn number(value: u64) -> Self {
        Self::N(value.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::N(n) => n.parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One stored item: attribute name -> value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Primary key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub hash_key: ShardKey,
    pub range_key: String,
}

impl ItemKey {
    pub fn new(hash_key: ShardKey, range_key: impl Into<String>) -> Self {
        Self {
            hash_key,
            range_key: range_key.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hash_key, self.range_key)
    }
}

/// Read a string attribute, failing with `CorruptItem` if absent or malformed.
pub fn string_attribute<'a>(item: &'a Item, name: &str) -> Result<&'a str> {
    match item.get(name) {
        Some(value) => value.as_str().ok_or_else(|| {
            GeoError::corrupt_item(format!("attribute '{}' is not a string: {:?}", name, value))
        }),
        None => Err(GeoError::corrupt_item(format!(
            "missing attribute '{}'",
            name
        ))),
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

const GEOJSON_POINT: &str = "Point";

/// Encode a point as a GeoJSON `Point` geometry (`[lng, lat]` order).
///
/// # Examples
///
/// ```
/// use geoscan::storage::item::{decode_point, encode_point};
/// use geoscan_types::point::GeoPoint;
///
/// let json = encode_point(&GeoPoint::new(40.7128, -74.006)).unwrap();
/// assert_eq!(json, r#"{"type":"Point","coordinates":[-74.006,40.7128]}"#);
/// assert_eq!(decode_point(&json).unwrap(), GeoPoint::new(40.7128, -74.006));
/// ```
pub fn encode_point(point: &GeoPoint) -> Result<String> {
    let geometry = GeoJsonPoint {
        kind: GEOJSON_POINT.to_string(),
        coordinates: [point.lng(), point.lat()],
    };
    Ok(serde_json::to_string(&geometry)?)
}

/// Decode a GeoJSON `Point` payload; anything else is a corrupt item.
pub fn decode_point(payload: &str) -> Result<GeoPoint> {
    let geometry: GeoJsonPoint = serde_json::from_str(payload)
        .map_err(|e| GeoError::corrupt_item(format!("undecodable point payload: {}", e)))?;

    if geometry.kind != GEOJSON_POINT {
        return Err(GeoError::corrupt_item(format!(
            "expected GeoJSON Point, got '{}'",
            geometry.kind
        )));
    }

    let [lng, lat] = geometry.coordinates;
    let point = GeoPoint::new(lat, lng);
    if !point.is_valid() {
        return Err(GeoError::corrupt_item(format!(
            "payload coordinates out of range: {}",
            point
        )));
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parsing() {
        let mut item = Item::new();
        item.insert("cell".into(), AttributeValue::number(u64::MAX));
        item.insert("name".into(), AttributeValue::from("cafe"));
        item.insert("bad".into(), AttributeValue::N("12x".into()));

        assert_eq!(item["cell"].as_u64(), Some(u64::MAX));
        assert_eq!(item["bad"].as_u64(), None);
        assert_eq!(string_attribute(&item, "name").unwrap(), "cafe");
        assert!(matches!(string_attribute(&item, "cell"), Err(GeoError::CorruptItem(_))));
        assert!(matches!(string_attribute(&item, "missing"), Err(GeoError::CorruptItem(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_point("not json"), Err(GeoError::CorruptItem(_))));
        assert!(matches!(
            decode_point(r#"{"type":"LineString","coordinates":[1.0,2.0]}"#),
            Err(GeoError::CorruptItem(_))
        ));
        assert!(matches!(
            decode_point(r#"{"type":"Point","coordinates":[1.0]}"#),
            Err(GeoError::CorruptItem(_))
        ));
        assert!(matches!(
            decode_point(r#"{"type":"Point","coordinates":[10.0,95.0]}"#),
            Err(GeoError::CorruptItem(_))
        ));
    }

    #[test]
    fn test_decode_accepts_foreign_field_order() {
        let point = decode_point(r#"{"coordinates":[2.3522,48.8566],"type":"Point"}"#).unwrap();
        assert_eq!(point, GeoPoint::new(48.8566, 2.3522));
    }
}
