//! Structured storage using redb
//!
//! This module provides the persistent store for:
//! - Admin units, one table per kind
//! - Townlands and their ancestor links
//! - Townland geometry in both projections
//! - Directed touch edges keyed by ordered townland pair

mod tables;
mod townland_store;

pub use tables::{RedbStorage, RedbStorageConfig, SCHEMA_VERSION};
pub use townland_store::RedbTownlandStore;
