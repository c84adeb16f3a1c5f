//! Error types for townland-spatial

use thiserror::Error;

/// Errors raised by the spatial primitives
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    /// EPSG code with no known definition
    #[error("Unsupported coordinate reference: EPSG:{0}")]
    UnsupportedCrs(u32),

    /// Projection definition or coordinate transform failed
    #[error("Projection error: {0}")]
    Projection(String),

    /// Geometry has no polygonal content
    #[error("Geometry is not polygonal: {0}")]
    NonPolygonal(&'static str),

    /// Geometry cannot be repaired into a valid polygon set
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),
}

impl SpatialError {
    /// Create a new Projection error
    pub fn projection(message: impl Into<String>) -> Self {
        Self::Projection(message.into())
    }

    /// Create a new Degenerate error
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::Degenerate(message.into())
    }
}

impl From<proj4rs::errors::Error> for SpatialError {
    fn from(err: proj4rs::errors::Error) -> Self {
        SpatialError::Projection(err.to_string())
    }
}
