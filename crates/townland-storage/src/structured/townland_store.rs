//! redb-backed TownlandStore
//!
//! Each trait write runs in its own write transaction, so a record lands
//! completely or not at all. Referential checks read through the same
//! transaction that performs the write.

use async_trait::async_trait;
use redb::{ReadableTable, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use townland_core::{AdminKey, AdminKind, AdminUnit, TouchEdge, Townland, TownlandKey};
use townland_spatial::MultiPolygon;

use super::tables::{
    RedbStorage, RedbStorageConfig, TOWNLAND_GEOMS, TOWNLAND_TOUCHES, TOWNLANDS, admin_table,
};
use crate::error::StorageError;
use crate::geometry::GeometryRecord;
use crate::{StoreStats, TownlandStore};

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(postcard::from_bytes(bytes)?)
}

/// Persistent townland store over redb
pub struct RedbTownlandStore {
    storage: RedbStorage,
}

impl RedbTownlandStore {
    /// Open or create the store
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            storage: RedbStorage::open(config)?,
        })
    }

    /// Wrap an already opened storage manager
    pub fn new(storage: RedbStorage) -> Self {
        Self { storage }
    }

    /// Get the underlying storage manager
    pub fn storage(&self) -> &RedbStorage {
        &self.storage
    }

    fn merge_admin_in(txn: &WriteTransaction, unit: &AdminUnit) -> Result<(), StorageError> {
        let mut table = txn.open_table(admin_table(unit.kind))?;
        let stored = table
            .get(unit.key.get())?
            .map(|v| decode::<AdminUnit>(v.value()))
            .transpose()?;

        let merged = match stored {
            Some(mut stored) => {
                stored.merge_from(unit);
                stored
            }
            None => unit.clone(),
        };
        table.insert(unit.key.get(), encode(&merged)?.as_slice())?;
        Ok(())
    }

    fn ensure_townland_in(txn: &WriteTransaction, key: TownlandKey) -> Result<(), StorageError> {
        let table = txn.open_table(TOWNLANDS)?;
        if table.get(key.get())?.is_some() {
            Ok(())
        } else {
            Err(StorageError::MissingTownland(key))
        }
    }

    fn decode_all<T: DeserializeOwned>(rows: Vec<Vec<u8>>) -> Result<Vec<T>, StorageError> {
        rows.iter().map(|bytes| decode(bytes)).collect()
    }
}

#[async_trait]
impl TownlandStore for RedbTownlandStore {
    async fn upsert_admin_unit(&self, unit: &AdminUnit) -> Result<(), StorageError> {
        trace!(kind = %unit.kind, key = %unit.key, "Upserting admin unit");
        let txn = self.storage.begin_write()?;
        Self::merge_admin_in(&txn, unit)?;
        txn.commit()?;
        Ok(())
    }

    #[instrument(skip(self, ancestors, townland), fields(townland = %townland.key))]
    async fn upsert_townland(
        &self,
        ancestors: &[AdminUnit],
        townland: Townland,
    ) -> Result<(), StorageError> {
        let txn = self.storage.begin_write()?;
        for unit in ancestors {
            Self::merge_admin_in(&txn, unit)?;
        }

        {
            let mut table = txn.open_table(TOWNLANDS)?;
            let stored = table
                .get(townland.key.get())?
                .map(|v| decode::<Townland>(v.value()))
                .transpose()?;
            let record = match stored {
                Some(mut stored) => {
                    stored.replace_attributes(townland);
                    stored
                }
                None => townland,
            };
            table.insert(record.key.get(), encode(&record)?.as_slice())?;
        }

        txn.commit()?;
        trace!("Upserted townland");
        Ok(())
    }

    async fn admin_unit(
        &self,
        kind: AdminKind,
        key: AdminKey,
    ) -> Result<Option<AdminUnit>, StorageError> {
        self.storage
            .get(admin_table(kind), key.get())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    async fn admin_units(&self, kind: AdminKind) -> Result<Vec<AdminUnit>, StorageError> {
        Self::decode_all(self.storage.scan(admin_table(kind))?)
    }

    async fn townland(&self, key: TownlandKey) -> Result<Option<Townland>, StorageError> {
        self.storage
            .get(TOWNLANDS, key.get())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    async fn contains_townland(&self, key: TownlandKey) -> Result<bool, StorageError> {
        self.storage.contains(TOWNLANDS, key.get())
    }

    async fn townlands(&self) -> Result<Vec<Townland>, StorageError> {
        Self::decode_all(self.storage.scan(TOWNLANDS)?)
    }

    #[instrument(skip(self, projected, source_feature, wikidata), fields(townland = %key))]
    async fn upsert_geometry(
        &self,
        key: TownlandKey,
        projected: MultiPolygon<f64>,
        source_feature: String,
        wikidata: Option<String>,
    ) -> Result<GeometryRecord, StorageError> {
        let txn = self.storage.begin_write()?;
        Self::ensure_townland_in(&txn, key)?;

        let record = GeometryRecord::derive(key, projected, source_feature)?;
        {
            let mut geoms = txn.open_table(TOWNLAND_GEOMS)?;
            geoms.insert(key.get(), encode(&record)?.as_slice())?;
        }

        if let Some(wikidata) = wikidata {
            let mut townlands = txn.open_table(TOWNLANDS)?;
            let stored = townlands
                .get(key.get())?
                .map(|v| decode::<Townland>(v.value()))
                .transpose()?;
            if let Some(mut townland) = stored {
                townland.wikidata = Some(wikidata);
                townlands.insert(key.get(), encode(&townland)?.as_slice())?;
            }
        }

        txn.commit()?;
        debug!(area_m2 = record.area_m2, "Stored geometry");
        Ok(record)
    }

    async fn geometry(&self, key: TownlandKey) -> Result<Option<GeometryRecord>, StorageError> {
        self.storage
            .get(TOWNLAND_GEOMS, key.get())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    async fn geometries(&self) -> Result<Vec<GeometryRecord>, StorageError> {
        Self::decode_all(self.storage.scan(TOWNLAND_GEOMS)?)
    }

    async fn upsert_touch(&self, edge: &TouchEdge) -> Result<(), StorageError> {
        trace!(src = %edge.src, dst = %edge.dst, "Upserting touch");
        let txn = self.storage.begin_write()?;
        Self::ensure_townland_in(&txn, edge.src)?;
        Self::ensure_townland_in(&txn, edge.dst)?;
        {
            let mut table = txn.open_table(TOWNLAND_TOUCHES)?;
            table.insert((edge.src.get(), edge.dst.get()), encode(edge)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    async fn upsert_mirror_touch(&self, edge: &TouchEdge) -> Result<bool, StorageError> {
        let txn = self.storage.begin_write()?;
        Self::ensure_townland_in(&txn, edge.src)?;
        Self::ensure_townland_in(&txn, edge.dst)?;

        let written = {
            let mut table = txn.open_table(TOWNLAND_TOUCHES)?;
            let pair = (edge.src.get(), edge.dst.get());
            let explicit = match table.get(pair)? {
                Some(bytes) => !decode::<TouchEdge>(bytes.value())?.mirrored,
                None => false,
            };
            if !explicit {
                table.insert(pair, encode(edge)?.as_slice())?;
            }
            !explicit
        };

        if written {
            txn.commit()?;
        } else {
            txn.abort()?;
        }
        Ok(written)
    }

    async fn touch(
        &self,
        src: TownlandKey,
        dst: TownlandKey,
    ) -> Result<Option<TouchEdge>, StorageError> {
        self.storage
            .get_touch(src.get(), dst.get())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    async fn touches_from(&self, src: TownlandKey) -> Result<Vec<TouchEdge>, StorageError> {
        Self::decode_all(self.storage.scan_touches_from(src.get())?)
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        Ok(StoreStats {
            counties: self.storage.count(admin_table(AdminKind::County))?,
            baronies: self.storage.count(admin_table(AdminKind::Barony))?,
            civil_parishes: self.storage.count(admin_table(AdminKind::CivilParish))?,
            electoral_divisions: self
                .storage
                .count(admin_table(AdminKind::ElectoralDivision))?,
            townlands: self.storage.count(TOWNLANDS)?,
            geometries: self.storage.count(TOWNLAND_GEOMS)?,
            touches: self.storage.count_touches()?,
        })
    }

    async fn checkpoint(&self) -> Result<(), StorageError> {
        self.storage.checkpoint()
    }
}
