//! # Townland Ingest
//!
//! The three loaders that fill a [`townland_storage::TownlandStore`]:
//!
//! - [`AdminHierarchyLoader`]: the attribute table (townlands and their
//!   county, barony, civil parish, and electoral division)
//! - [`GeometryPipeline`]: GeoJSON polygon collections
//! - [`AdjacencyPipeline`]: the directed touch table
//!
//! The attribute load must run first for any townland the other two
//! reference; geometry and adjacency are independent of each other.
//!
//! Every loader is a sequence of idempotent per-record upserts, committed
//! durably every `batch_size` records. Bad records are collected in an
//! [`IngestReport`]; only systemic failures are returned as [`IngestError`].

pub mod adjacency;
pub mod attributes;
pub mod config;
pub mod error;
pub mod geometry;
pub mod parse;
pub mod report;

pub use adjacency::{AdjacencyPipeline, TOUCH_HEADERS, TouchRecord};
pub use attributes::{ATTRIBUTE_HEADERS, AdminHierarchyLoader, AttributeRecord};
pub use config::{AdjacencyLoadConfig, AttributeLoadConfig, GeometryLoadConfig};
pub use error::IngestError;
pub use geometry::{FeatureOutcome, GeometryPipeline, collection_files, feature_id};
pub use report::{
    AdjacencyLoadSummary, AttributeLoadSummary, GeometryLoadSummary, IngestReport, RejectReason,
    Rejection,
};
