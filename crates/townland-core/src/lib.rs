//! # Townland Core
//!
//! Core types, identity resolution, and errors for the townland store.
//!
//! The store relates three independently keyed datasets (an attribute table,
//! polygon collections, and a pairwise adjacency table) through a single
//! canonical integer key space. This crate holds the records every other
//! crate passes around, plus the pure functions that do not need storage.
//!
//! ## Key Types
//!
//! - [`TownlandKey`] / [`AdminKey`]: canonical keys for townlands and admin units
//! - [`IdentityResolver`]: maps raw source identifiers onto canonical keys
//! - [`AdminUnit`] / [`AdminKind`]: the four ancestor levels
//! - [`Townland`]: the primary entity, with its ancestor links
//! - [`TouchEdge`] / [`CompassBucket`]: directed adjacency and its 8-way bucket

pub mod admin;
pub mod error;
pub mod identity;
pub mod touch;
pub mod townland;

// Re-export main types
pub use admin::*;
pub use error::*;
pub use identity::*;
pub use touch::*;
pub use townland::*;
