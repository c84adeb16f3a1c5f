//! Error types for townland-storage
//!
//! Every variant here is fatal for the record (or batch) that raised it:
//! pipelines propagate these rather than folding them into a run report.

use thiserror::Error;

use townland_core::TownlandKey;

/// Storage failure
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure around the database file
    #[error("Storage I/O failed: {0}")]
    Io(String),

    /// redb refused an open, transaction, table, or commit
    #[error("Database failure: {0}")]
    Database(String),

    /// A stored value could not be encoded or decoded
    #[error("Value encoding failed: {0}")]
    Encoding(String),

    /// A write referenced a townland that is not stored
    #[error("Townland {0} does not exist")]
    MissingTownland(TownlandKey),

    /// Deriving the serving geometry failed
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The database was written by an incompatible schema
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: u64, found: u64 },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<postcard::Error> for StorageError {
    fn from(err: postcard::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<townland_spatial::SpatialError> for StorageError {
    fn from(err: townland_spatial::SpatialError) -> Self {
        Self::Geometry(err.to_string())
    }
}

macro_rules! database_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StorageError {
                fn from(err: $ty) -> Self {
                    StorageError::Database(err.to_string())
                }
            }
        )*
    };
}

database_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
