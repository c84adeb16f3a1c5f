//! Error types for the townland store

use thiserror::Error;

/// Errors produced while resolving a raw source identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Feature identifier is empty")]
    Empty,

    #[error("Feature identifier {0:?} is not of the form <kind>/<digits>")]
    InvalidShape(String),

    #[error("Feature identifier {0:?} does not fit the canonical key space")]
    OutOfRange(String),
}

/// Errors produced while building domain records from raw values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Bearing is not a finite number: {0}")]
    NonFiniteBearing(f64),

    #[error("Shared length must be a non-negative number, got {0}")]
    InvalidLength(f64),
}
