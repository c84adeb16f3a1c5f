//! # Townland Spatial
//!
//! The spatial primitives the store relies on: coordinate references,
//! reprojection, topology repair, and envelope indexing.
//!
//! Canonical geometry is kept in Irish Transverse Mercator (EPSG:2157), a
//! metric projection suited to area and containment math across the island.
//! Serving geometry is WGS 84 longitude/latitude (EPSG:4326).
//!
//! ## Features
//!
//! - **Crs**: the coordinate references a polygon source may declare
//! - **Reprojector**: transforms points and polygon sets between references
//! - **repair**: cardinality normalisation and self-intersection repair
//! - **EnvelopeIndex**: R-tree over bounding boxes for candidate lookup

pub mod crs;
pub mod error;
pub mod index;
pub mod repair;
pub mod transform;

pub use crs::Crs;
pub use error::SpatialError;
pub use index::EnvelopeIndex;
pub use repair::{Repaired, polygonal_parts, repair};
pub use transform::Reprojector;

// Geometry types shared by every crate above this one
pub use geo_types::{Coord, MultiPolygon, Point, Polygon, Rect};

/// Reference used for canonical storage and metric computation
pub const PROJECTED: Crs = Crs::IrishTransverseMercator;

/// Reference used for input and serving
pub const GEOGRAPHIC: Crs = Crs::Wgs84;
