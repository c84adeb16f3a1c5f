//! # Townland Query
//!
//! Reverse-geocoding and neighbour traversal over a populated
//! [`townland_storage::TownlandStore`].
//!
//! - **Point lookup**: longitude/latitude to the covering townland and its
//!   county, barony, civil parish, and electoral division
//! - **Neighbour lookup**: townland name pattern (optionally within a county)
//!   to its touching townlands in compass order
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use townland_query::QueryEngine;
//!
//! let engine = QueryEngine::open(Arc::new(store)).await?;
//! if let Some(hit) = engine.lookup_point(-6.26, 53.35).await? {
//!     println!("{}", hit.townland.name);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod pattern;

pub use engine::{Neighbour, NeighbourSet, PointLookup, QueryEngine, sort_by_direction};
pub use error::QueryError;
pub use pattern::NamePattern;
