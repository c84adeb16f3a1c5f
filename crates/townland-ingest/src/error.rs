//! Error types for townland-ingest
//!
//! Only systemic failures live here. A bad row or feature never becomes an
//! `IngestError`; it is recorded in the run's [`crate::IngestReport`].

use std::path::PathBuf;

use thiserror::Error;

use townland_spatial::SpatialError;
use townland_storage::StorageError;

/// Errors that abort an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    /// An input file or folder could not be read
    #[error("Cannot read {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The CSV input lacks columns the loader needs
    #[error("{source_name} is missing expected headers: {missing:?}")]
    MissingHeaders {
        source_name: String,
        missing: Vec<&'static str>,
    },

    /// The CSV input could not be read at all
    #[error("CSV error in {source_name}: {message}")]
    Csv {
        source_name: String,
        message: String,
    },

    /// A geometry file is not a GeoJSON document
    #[error("Invalid GeoJSON in {source_name}: {message}")]
    GeoJson {
        source_name: String,
        message: String,
    },

    /// The configured source coordinate reference is unusable
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// The store failed; never swallowed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Create a new Io error
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a new Csv error
    pub fn csv(source_name: impl Into<String>, err: csv::Error) -> Self {
        Self::Csv {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_headers_lists_columns() {
        let err = IngestError::MissingHeaders {
            source_name: "townlands.csv".into(),
            missing: vec!["OSM_ID", "NAME_TAG"],
        };
        let msg = err.to_string();
        assert!(msg.contains("townlands.csv"));
        assert!(msg.contains("NAME_TAG"));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: IngestError = StorageError::Database("gone".into()).into();
        assert!(matches!(err, IngestError::Storage(_)));
    }
}
