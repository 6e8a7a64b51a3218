//! Error types for the search core.

use thiserror::Error;

/// Errors produced by GeoJSON ingestion and query-parameter validation.
///
/// The near iterator itself is infallible once constructed; everything
/// that can go wrong happens while validating inputs.
#[derive(Error, Debug)]
pub enum GeoError {
    /// Malformed input: bad GeoJSON geometry, invalid loop, bad
    /// coordinate array, or an invalid query parameter range.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// Recognized but unsupported GeoJSON kind (MultiPolygon,
    /// GeometryCollection).
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl GeoError {
    pub(crate) fn bad(msg: impl Into<String>) -> Self {
        GeoError::BadParameter(msg.into())
    }
}

/// Result type for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;
