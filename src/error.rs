//! Error types for geoscan.

use thiserror::Error;

/// Errors produced by indexing, storage access and query orchestration.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Coordinates outside the valid latitude/longitude domain.
    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    /// A query region that cannot be covered (inverted or wrapping rectangle, bad radius).
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// A cell id range with `min > max`.
    #[error("Invalid range: [{min}, {max}]")]
    InvalidRange { min: u64, max: u64 },

    /// Caller supplied a malformed argument or item.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transient store failure; safe to retry with backoff.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored item whose attributes or payload cannot be decoded.
    #[error("Corrupt item: {0}")]
    CorruptItem(String),

    /// The query's cancellation token fired (caller cancel or deadline).
    #[error("Query cancelled")]
    Cancelled,

    /// A scan task died without returning a result.
    #[error("Scan task failed: {0}")]
    TaskFailed(String),

    /// Aggregate failure of a fanned-out query, carrying the first cause.
    #[error("Querying the store failed: {source}")]
    QueryFailed {
        #[source]
        source: Box<GeoError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeoError {
    pub fn invalid_point(msg: impl Into<String>) -> Self {
        Self::InvalidPoint(msg.into())
    }

    pub fn storage_unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn corrupt_item(msg: impl Into<String>) -> Self {
        Self::CorruptItem(msg.into())
    }

    pub fn query_failed(cause: GeoError) -> Self {
        Self::QueryFailed {
            source: Box::new(cause),
        }
    }

    /// Whether the caller may retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable(_) => true,
            Self::QueryFailed { source } => source.is_retryable(),
            _ => false,
        }
    }

    /// The underlying cause of a `QueryFailed`, or `self` for any other error.
    pub fn root_cause(&self) -> &GeoError {
        match self {
            Self::QueryFailed { source } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for geoscan operations.
pub type Result<T> = std::result::Result<T, GeoError>;
