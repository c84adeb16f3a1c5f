//! In-memory storage implementation
//!
//! Provides an in-memory [`TownlandStore`] suitable for tests and for
//! one-shot runs that never need to persist.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use townland_core::{AdminKey, AdminKind, AdminUnit, TouchEdge, Townland, TownlandKey};
use townland_spatial::MultiPolygon;

use crate::error::StorageError;
use crate::geometry::GeometryRecord;
use crate::{StoreStats, TownlandStore};

/// In-memory implementation of TownlandStore
///
/// Uses `DashMap` for concurrent reads. Writes that touch more than one map
/// are serialized through `write_lock` so that a townland never lands
/// without its ancestors.
#[derive(Debug, Default)]
pub struct InMemoryTownlandStore {
    admin: DashMap<(AdminKind, AdminKey), AdminUnit>,
    townlands: DashMap<TownlandKey, Townland>,
    geometries: DashMap<TownlandKey, GeometryRecord>,
    /// Outgoing edges per source townland
    touches: DashMap<TownlandKey, BTreeMap<TownlandKey, TouchEdge>>,
    write_lock: Mutex<()>,
}

impl InMemoryTownlandStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn merge_admin(&self, unit: &AdminUnit) {
        self.admin
            .entry((unit.kind, unit.key))
            .and_modify(|stored| stored.merge_from(unit))
            .or_insert_with(|| unit.clone());
    }

    fn ensure_townland(&self, key: TownlandKey) -> Result<(), StorageError> {
        if self.townlands.contains_key(&key) {
            Ok(())
        } else {
            Err(StorageError::MissingTownland(key))
        }
    }
}

#[async_trait]
impl TownlandStore for InMemoryTownlandStore {
    async fn upsert_admin_unit(&self, unit: &AdminUnit) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        trace!(kind = %unit.kind, key = %unit.key, "Upserting admin unit");
        self.merge_admin(unit);
        Ok(())
    }

    async fn upsert_townland(
        &self,
        ancestors: &[AdminUnit],
        townland: Townland,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        for unit in ancestors {
            self.merge_admin(unit);
        }

        trace!(townland = %townland.key, "Upserting townland");
        match self.townlands.get_mut(&townland.key) {
            Some(mut stored) => stored.replace_attributes(townland),
            None => {
                self.townlands.insert(townland.key, townland);
            }
        }
        Ok(())
    }

    async fn admin_unit(
        &self,
        kind: AdminKind,
        key: AdminKey,
    ) -> Result<Option<AdminUnit>, StorageError> {
        Ok(self.admin.get(&(kind, key)).map(|u| u.clone()))
    }

    async fn admin_units(&self, kind: AdminKind) -> Result<Vec<AdminUnit>, StorageError> {
        let mut units: Vec<AdminUnit> = self
            .admin
            .iter()
            .filter(|e| e.key().0 == kind)
            .map(|e| e.value().clone())
            .collect();
        units.sort_by_key(|u| u.key);
        Ok(units)
    }

    async fn townland(&self, key: TownlandKey) -> Result<Option<Townland>, StorageError> {
        Ok(self.townlands.get(&key).map(|t| t.clone()))
    }

    async fn contains_townland(&self, key: TownlandKey) -> Result<bool, StorageError> {
        Ok(self.townlands.contains_key(&key))
    }

    async fn townlands(&self) -> Result<Vec<Townland>, StorageError> {
        let mut all: Vec<Townland> = self.townlands.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|t| t.key);
        Ok(all)
    }

    async fn upsert_geometry(
        &self,
        key: TownlandKey,
        projected: MultiPolygon<f64>,
        source_feature: String,
        wikidata: Option<String>,
    ) -> Result<GeometryRecord, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_townland(key)?;

        let record = GeometryRecord::derive(key, projected, source_feature)?;
        if let Some(wikidata) = wikidata {
            if let Some(mut townland) = self.townlands.get_mut(&key) {
                townland.wikidata = Some(wikidata);
            }
        }
        self.geometries.insert(key, record.clone());

        debug!(townland = %key, area_m2 = record.area_m2, "Stored geometry");
        Ok(record)
    }

    async fn geometry(&self, key: TownlandKey) -> Result<Option<GeometryRecord>, StorageError> {
        Ok(self.geometries.get(&key).map(|g| g.clone()))
    }

    async fn geometries(&self) -> Result<Vec<GeometryRecord>, StorageError> {
        let mut all: Vec<GeometryRecord> =
            self.geometries.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|g| g.key);
        Ok(all)
    }

    async fn upsert_touch(&self, edge: &TouchEdge) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_townland(edge.src)?;
        self.ensure_townland(edge.dst)?;

        trace!(src = %edge.src, dst = %edge.dst, "Upserting touch");
        self.touches
            .entry(edge.src)
            .or_default()
            .insert(edge.dst, edge.clone());
        Ok(())
    }

    async fn upsert_mirror_touch(&self, edge: &TouchEdge) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_townland(edge.src)?;
        self.ensure_townland(edge.dst)?;

        let mut outgoing = self.touches.entry(edge.src).or_default();
        if outgoing.get(&edge.dst).is_some_and(|stored| !stored.mirrored) {
            return Ok(false);
        }
        outgoing.insert(edge.dst, edge.clone());
        Ok(true)
    }

    async fn touch(
        &self,
        src: TownlandKey,
        dst: TownlandKey,
    ) -> Result<Option<TouchEdge>, StorageError> {
        Ok(self
            .touches
            .get(&src)
            .and_then(|outgoing| outgoing.get(&dst).cloned()))
    }

    async fn touches_from(&self, src: TownlandKey) -> Result<Vec<TouchEdge>, StorageError> {
        Ok(self
            .touches
            .get(&src)
            .map(|outgoing| outgoing.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        let mut stats = StoreStats {
            townlands: self.townlands.len(),
            geometries: self.geometries.len(),
            touches: self.touches.iter().map(|e| e.value().len()).sum(),
            ..Default::default()
        };
        for entry in self.admin.iter() {
            match entry.key().0 {
                AdminKind::County => stats.counties += 1,
                AdminKind::Barony => stats.baronies += 1,
                AdminKind::CivilParish => stats.civil_parishes += 1,
                AdminKind::ElectoralDivision => stats.electoral_divisions += 1,
            }
        }
        Ok(stats)
    }
}
