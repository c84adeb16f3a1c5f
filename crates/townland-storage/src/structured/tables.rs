//! redb table definitions and storage manager
//!
//! Defines all tables used for structured storage.

use std::path::PathBuf;
use std::sync::Arc;

use redb::{
    Database, Durability, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction,
};
use tracing::{debug, info, instrument};

use townland_core::AdminKind;

use crate::error::StorageError;

/// Bumped whenever a stored value layout changes
pub const SCHEMA_VERSION: u64 = 2;

// Table definitions
// Key: setting name, Value: setting value
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

// Key: admin key, Value: serialized AdminUnit
pub const COUNTIES: TableDefinition<i64, &[u8]> = TableDefinition::new("counties");
pub const BARONIES: TableDefinition<i64, &[u8]> = TableDefinition::new("baronies");
pub const CIVIL_PARISHES: TableDefinition<i64, &[u8]> = TableDefinition::new("civil_parishes");
pub const ELECTORAL_DIVISIONS: TableDefinition<i64, &[u8]> =
    TableDefinition::new("electoral_divisions");

// Key: townland key, Value: serialized Townland
pub const TOWNLANDS: TableDefinition<i64, &[u8]> = TableDefinition::new("townlands");

// Key: townland key, Value: serialized GeometryRecord
pub const TOWNLAND_GEOMS: TableDefinition<i64, &[u8]> = TableDefinition::new("townland_geoms");

// Key: (src, dst) townland keys, Value: serialized TouchEdge
pub const TOWNLAND_TOUCHES: TableDefinition<(i64, i64), &[u8]> =
    TableDefinition::new("townland_touches");

/// The table holding one kind of admin unit
pub fn admin_table(kind: AdminKind) -> TableDefinition<'static, i64, &'static [u8]> {
    match kind {
        AdminKind::County => COUNTIES,
        AdminKind::Barony => BARONIES,
        AdminKind::CivilParish => CIVIL_PARISHES,
        AdminKind::ElectoralDivision => ELECTORAL_DIVISIONS,
    }
}

/// Configuration for redb storage
#[derive(Debug, Clone)]
pub struct RedbStorageConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Cache size in bytes
    pub cache_size: usize,
}

impl Default for RedbStorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/townlands.redb"),
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Main redb storage manager
///
/// Record writes commit with [`Durability::None`]: each is atomic and
/// visible to later reads, and [`RedbStorage::checkpoint`] makes everything
/// up to that point durable. Loaders checkpoint at batch boundaries.
pub struct RedbStorage {
    db: Arc<Database>,
    config: RedbStorageConfig,
}

impl RedbStorage {
    /// Open or create the database
    #[instrument(skip(config), fields(path = %config.db_path.display()))]
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::builder()
            .set_cache_size(config.cache_size)
            .create(&config.db_path)?;

        info!("Opened redb database");

        let storage = Self {
            db: Arc::new(db),
            config,
        };

        // Initialize tables
        storage.init_tables()?;

        Ok(storage)
    }

    /// Create every table and stamp or check the schema version
    fn init_tables(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;

        {
            let mut meta = write_txn.open_table(META)?;
            let found = meta.get("schema_version")?.map(|v| v.value());
            match found {
                Some(found) if found != SCHEMA_VERSION => {
                    return Err(StorageError::SchemaMismatch {
                        expected: SCHEMA_VERSION,
                        found,
                    });
                }
                Some(_) => {}
                None => {
                    meta.insert("schema_version", SCHEMA_VERSION)?;
                }
            }
        }

        // Create tables if they don't exist
        for kind in AdminKind::ALL {
            write_txn.open_table(admin_table(kind))?;
        }
        write_txn.open_table(TOWNLANDS)?;
        write_txn.open_table(TOWNLAND_GEOMS)?;
        write_txn.open_table(TOWNLAND_TOUCHES)?;

        write_txn.commit()?;

        debug!(schema_version = SCHEMA_VERSION, "Initialized redb tables");
        Ok(())
    }

    /// Get a reference to the database
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Get the configuration
    pub fn config(&self) -> &RedbStorageConfig {
        &self.config
    }

    /// Begin a record write
    pub fn begin_write(&self) -> Result<WriteTransaction, StorageError> {
        let mut write_txn = self.db.begin_write()?;
        write_txn.set_durability(Durability::None);
        Ok(write_txn)
    }

    /// Persist every record write committed so far
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        let mut write_txn = self.db.begin_write()?;
        write_txn.set_durability(Durability::Immediate);
        write_txn.commit()?;
        debug!("Checkpointed redb database");
        Ok(())
    }

    /// Get a value from a key-addressed table
    pub fn get(
        &self,
        table: TableDefinition<i64, &[u8]>,
        key: i64,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let value = table.get(key)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    /// Whether a key is present
    pub fn contains(
        &self,
        table: TableDefinition<i64, &[u8]>,
        key: i64,
    ) -> Result<bool, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        Ok(table.get(key)?.is_some())
    }

    /// Every value in a key-addressed table, in key order
    pub fn scan(&self, table: TableDefinition<i64, &[u8]>) -> Result<Vec<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;

        let mut results = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            results.push(value.value().to_vec());
        }
        Ok(results)
    }

    /// Get one touch edge
    pub fn get_touch(&self, src: i64, dst: i64) -> Result<Option<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOWNLAND_TOUCHES)?;
        let value = table.get((src, dst))?.map(|v| v.value().to_vec());
        Ok(value)
    }

    /// Every touch edge leaving `src`, in destination order
    pub fn scan_touches_from(&self, src: i64) -> Result<Vec<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOWNLAND_TOUCHES)?;

        let mut results = Vec::new();
        for entry in table.range((src, i64::MIN)..=(src, i64::MAX))? {
            let (_, value) = entry?;
            results.push(value.value().to_vec());
        }
        Ok(results)
    }

    /// Count entries in a key-addressed table
    pub fn count(&self, table: TableDefinition<i64, &[u8]>) -> Result<usize, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        Ok(table.len()? as usize)
    }

    /// Count touch edges
    pub fn count_touches(&self) -> Result<usize, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOWNLAND_TOUCHES)?;
        Ok(table.len()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (RedbStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig {
            db_path: temp_dir.path().join("test.redb"),
            ..Default::default()
        };
        let storage = RedbStorage::open(config).unwrap();
        (storage, temp_dir)
    }

    fn put(storage: &RedbStorage, table: TableDefinition<i64, &[u8]>, key: i64, value: &[u8]) {
        let write_txn = storage.begin_write().unwrap();
        write_txn.open_table(table).unwrap().insert(key, value).unwrap();
        write_txn.commit().unwrap();
    }

    #[test]
    fn test_put_get() {
        let (storage, _temp) = create_test_storage();

        put(&storage, TOWNLANDS, -42, b"value");

        assert_eq!(storage.get(TOWNLANDS, -42).unwrap(), Some(b"value".to_vec()));
        assert!(storage.contains(TOWNLANDS, -42).unwrap());
        assert!(!storage.contains(TOWNLAND_GEOMS, -42).unwrap());
    }

    #[test]
    fn test_scan_in_key_order() {
        let (storage, _temp) = create_test_storage();

        put(&storage, COUNTIES, 3, b"c");
        put(&storage, COUNTIES, -1, b"a");
        put(&storage, COUNTIES, 2, b"b");

        let values = storage.scan(COUNTIES).unwrap();
        assert_eq!(values, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(storage.count(COUNTIES).unwrap(), 3);
        assert_eq!(storage.count(BARONIES).unwrap(), 0);
    }

    #[test]
    fn test_touch_range_stays_on_source() {
        let (storage, _temp) = create_test_storage();

        let write_txn = storage.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(TOWNLAND_TOUCHES).unwrap();
            table.insert((1, 5), b"1-5".as_slice()).unwrap();
            table.insert((1, -9), b"1-9".as_slice()).unwrap();
            table.insert((2, 1), b"2-1".as_slice()).unwrap();
        }
        write_txn.commit().unwrap();

        let from_one = storage.scan_touches_from(1).unwrap();
        assert_eq!(from_one, vec![b"1-9".to_vec(), b"1-5".to_vec()]);
        assert_eq!(storage.count_touches().unwrap(), 3);
    }

    #[test]
    fn test_checkpoint_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig {
            db_path: temp_dir.path().join("test.redb"),
            ..Default::default()
        };

        {
            let storage = RedbStorage::open(config.clone()).unwrap();
            put(&storage, TOWNLANDS, 7, b"kept");
            storage.checkpoint().unwrap();
        }

        let storage = RedbStorage::open(config).unwrap();
        assert_eq!(storage.get(TOWNLANDS, 7).unwrap(), Some(b"kept".to_vec()));
    }
}
