//! # Townland Storage
//!
//! The canonical store for the townland hierarchy, geometry, and adjacency.
//!
//! ## Features
//!
//! - **TownlandStore trait**: per-record atomic upserts and the reads the query engine needs
//! - **InMemoryTownlandStore**: in-memory implementation for testing
//! - **RedbTownlandStore**: redb-backed persistent implementation
//!
//! Every write is an idempotent replace keyed by canonical key (or by
//! ordered key pair for touch edges), so any batch may be re-run after an
//! interruption and arrives at the same end state.
//!
//! ## Example
//!
//! ```rust,ignore
//! use townland_core::{Townland, TownlandKey};
//! use townland_storage::{InMemoryTownlandStore, TownlandStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryTownlandStore::new();
//!     store
//!         .upsert_townland(&[], Townland::new(TownlandKey(100), "Ballybeg"))
//!         .await
//!         .unwrap();
//!     assert!(store.contains_townland(TownlandKey(100)).await.unwrap());
//! }
//! ```

pub mod error;
pub mod geometry;
pub mod memory;
pub mod structured;

// Re-exports
pub use error::StorageError;
pub use geometry::GeometryRecord;
pub use memory::InMemoryTownlandStore;
pub use structured::{RedbStorage, RedbStorageConfig, RedbTownlandStore, SCHEMA_VERSION};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use townland_core::{AdminKey, AdminKind, AdminUnit, TouchEdge, Townland, TownlandKey};
use townland_spatial::MultiPolygon;

/// Row counts per stored entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub counties: usize,
    pub baronies: usize,
    pub civil_parishes: usize,
    pub electoral_divisions: usize,
    pub townlands: usize,
    pub geometries: usize,
    pub touches: usize,
}

impl StoreStats {
    /// Count for one admin kind
    pub fn admin_units(&self, kind: AdminKind) -> usize {
        match kind {
            AdminKind::County => self.counties,
            AdminKind::Barony => self.baronies,
            AdminKind::CivilParish => self.civil_parishes,
            AdminKind::ElectoralDivision => self.electoral_divisions,
        }
    }
}

/// The canonical store
///
/// Each write method is atomic on its own: it either lands completely or not
/// at all. Writes referencing a townland reject unknown keys with
/// [`StorageError::MissingTownland`], so no geometry or touch row can exist
/// without its townland.
#[async_trait]
pub trait TownlandStore: Send + Sync {
    /// Upsert one admin unit, merging with any stored version
    async fn upsert_admin_unit(&self, unit: &AdminUnit) -> Result<(), StorageError>;

    /// Upsert a townland's ancestors and then the townland, in one transaction
    ///
    /// A stored Wikidata cross-reference survives the replace when the
    /// incoming record has none.
    async fn upsert_townland(
        &self,
        ancestors: &[AdminUnit],
        townland: Townland,
    ) -> Result<(), StorageError>;

    /// Get an admin unit
    async fn admin_unit(
        &self,
        kind: AdminKind,
        key: AdminKey,
    ) -> Result<Option<AdminUnit>, StorageError>;

    /// Get all admin units of one kind, ordered by key
    async fn admin_units(&self, kind: AdminKind) -> Result<Vec<AdminUnit>, StorageError>;

    /// Get a townland
    async fn townland(&self, key: TownlandKey) -> Result<Option<Townland>, StorageError>;

    /// Whether a townland is stored
    async fn contains_townland(&self, key: TownlandKey) -> Result<bool, StorageError>;

    /// Get all townlands, ordered by key
    async fn townlands(&self) -> Result<Vec<Townland>, StorageError>;

    /// Replace a townland's geometry
    ///
    /// Only the projected polygon set is accepted; the serving copy is
    /// derived here. When `wikidata` is present it is written onto the
    /// townland in the same transaction.
    async fn upsert_geometry(
        &self,
        key: TownlandKey,
        projected: MultiPolygon<f64>,
        source_feature: String,
        wikidata: Option<String>,
    ) -> Result<GeometryRecord, StorageError>;

    /// Get a townland's geometry
    async fn geometry(&self, key: TownlandKey) -> Result<Option<GeometryRecord>, StorageError>;

    /// Get every stored geometry, ordered by key
    async fn geometries(&self) -> Result<Vec<GeometryRecord>, StorageError>;

    /// Insert or replace the edge for `(edge.src, edge.dst)`
    async fn upsert_touch(&self, edge: &TouchEdge) -> Result<(), StorageError>;

    /// Write a mirrored edge unless its ordered pair holds an explicit edge
    ///
    /// An earlier mirror is replaced. Returns whether the edge was written.
    async fn upsert_mirror_touch(&self, edge: &TouchEdge) -> Result<bool, StorageError>;

    /// Get a touch edge
    async fn touch(
        &self,
        src: TownlandKey,
        dst: TownlandKey,
    ) -> Result<Option<TouchEdge>, StorageError>;

    /// Get every edge leaving `src`, ordered by destination key
    async fn touches_from(&self, src: TownlandKey) -> Result<Vec<TouchEdge>, StorageError>;

    /// Row counts
    async fn stats(&self) -> Result<StoreStats, StorageError>;

    /// Make every write so far durable
    ///
    /// Backends that are always durable (or never) treat this as a no-op.
    async fn checkpoint(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
