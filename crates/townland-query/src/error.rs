//! Error types for townland-query

use thiserror::Error;

use townland_spatial::SpatialError;
use townland_storage::StorageError;

/// Errors that can occur while answering a query
///
/// An empty answer is never an error: a point outside every townland or a
/// pattern matching nothing returns an empty result.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Longitude/latitude not finite or out of range
    #[error("Invalid point: longitude {lon}, latitude {lat}")]
    InvalidPoint { lon: f64, lat: f64 },

    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
