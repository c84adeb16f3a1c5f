//! Behaviour every TownlandStore backend must share
//!
//! Each scenario runs against the in-memory store and the redb store.

use geo_types::polygon;
use tempfile::TempDir;
use townland_core::{AdminKey, AdminKind, AdminUnit, Ancestors, TouchEdge, Townland, TownlandKey};
use townland_spatial::MultiPolygon;
use townland_storage::{
    InMemoryTownlandStore, RedbStorageConfig, RedbTownlandStore, StorageError, TownlandStore,
};

fn backends() -> (InMemoryTownlandStore, RedbTownlandStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let redb = RedbTownlandStore::open(RedbStorageConfig {
        db_path: temp_dir.path().join("contract.redb"),
        ..Default::default()
    })
    .unwrap();
    (InMemoryTownlandStore::new(), redb, temp_dir)
}

fn wicklow_townland(key: i64, name: &str) -> (Vec<AdminUnit>, Townland) {
    let ancestors = vec![
        AdminUnit::new(AdminKind::County, AdminKey(1)).with_name("Wicklow"),
        AdminUnit::new(AdminKind::Barony, AdminKey(10))
            .with_name("Ballinacor North")
            .with_county(AdminKey(1)),
    ];
    let townland = Townland::new(TownlandKey(key), name).with_ancestors(Ancestors {
        county: Some(AdminKey(1)),
        barony: Some(AdminKey(10)),
        ..Default::default()
    });
    (ancestors, townland)
}

fn small_square() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: 700_000.0, y: 690_000.0),
        (x: 700_500.0, y: 690_000.0),
        (x: 700_500.0, y: 690_500.0),
        (x: 700_000.0, y: 690_500.0),
        (x: 700_000.0, y: 690_000.0),
    ]])
}

// ============================================================================
// Idempotence
// ============================================================================

/// Loading the same records twice leaves identical contents
async fn assert_reload_is_noop(store: &dyn TownlandStore) {
    for _ in 0..2 {
        for (key, name) in [(100, "Ballybeg"), (101, "Ballymore")] {
            let (ancestors, townland) = wicklow_townland(key, name);
            store.upsert_townland(&ancestors, townland).await.unwrap();
        }
        store
            .upsert_geometry(TownlandKey(100), small_square(), "{}".into(), None)
            .await
            .unwrap();
        let edge = TouchEdge::new(TownlandKey(100), TownlandKey(101), 45.0, 120.0).unwrap();
        store.upsert_touch(&edge).await.unwrap();
        store.checkpoint().await.unwrap();
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.counties, 1);
    assert_eq!(stats.baronies, 1);
    assert_eq!(stats.townlands, 2);
    assert_eq!(stats.geometries, 1);
    assert_eq!(stats.touches, 1);

    let barony = store
        .admin_unit(AdminKind::Barony, AdminKey(10))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(barony.county, Some(AdminKey(1)));
}

#[tokio::test]
async fn test_reload_is_noop() {
    let (memory, redb, _temp) = backends();
    assert_reload_is_noop(&memory).await;
    assert_reload_is_noop(&redb).await;
}

// ============================================================================
// Referential integrity
// ============================================================================

/// A touch with an unknown endpoint writes nothing
async fn assert_dangling_touch_rejected(store: &dyn TownlandStore) {
    let (ancestors, townland) = wicklow_townland(100, "Ballybeg");
    store.upsert_townland(&ancestors, townland).await.unwrap();

    let edge = TouchEdge::new(TownlandKey(100), TownlandKey(999), 0.0, 1.0).unwrap();
    let err = store.upsert_touch(&edge).await.unwrap_err();
    assert!(matches!(err, StorageError::MissingTownland(TownlandKey(999))));

    let err = store.upsert_mirror_touch(&edge.reversed()).await.unwrap_err();
    assert!(matches!(err, StorageError::MissingTownland(TownlandKey(999))));

    assert!(store.touches_from(TownlandKey(100)).await.unwrap().is_empty());
    assert_eq!(store.stats().await.unwrap().touches, 0);
}

#[tokio::test]
async fn test_dangling_touch_rejected() {
    let (memory, redb, _temp) = backends();
    assert_dangling_touch_rejected(&memory).await;
    assert_dangling_touch_rejected(&redb).await;
}

/// Stored geometry carries both projections of the same shape
async fn assert_geometry_projections_agree(store: &dyn TownlandStore) {
    let (ancestors, townland) = wicklow_townland(-5, "Knockree");
    store.upsert_townland(&ancestors, townland).await.unwrap();
    store
        .upsert_geometry(TownlandKey(-5), small_square(), "{\"type\":\"Feature\"}".into(), Some("Q9".into()))
        .await
        .unwrap();

    let record = store.geometry(TownlandKey(-5)).await.unwrap().unwrap();
    assert_eq!(record.projected, small_square());
    assert!((record.area_m2 - 250_000.0).abs() < 1e-6);
    for c in record.geographic.0[0].exterior().coords() {
        assert!((-11.0..-5.0).contains(&c.x), "longitude {} outside Ireland", c.x);
        assert!((51.0..56.0).contains(&c.y), "latitude {} outside Ireland", c.y);
    }

    let townland = store.townland(TownlandKey(-5)).await.unwrap().unwrap();
    assert_eq!(townland.wikidata.as_deref(), Some("Q9"));
    assert_eq!(store.geometries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_geometry_projections_agree() {
    let (memory, redb, _temp) = backends();
    assert_geometry_projections_agree(&memory).await;
    assert_geometry_projections_agree(&redb).await;
}

// ============================================================================
// Persistence
// ============================================================================

/// Checkpointed writes survive reopening the database
#[tokio::test]
async fn test_redb_reopen_after_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let config = RedbStorageConfig {
        db_path: temp_dir.path().join("reopen.redb"),
        ..Default::default()
    };

    {
        let store = RedbTownlandStore::open(config.clone()).unwrap();
        let (ancestors, townland) = wicklow_townland(100, "Ballybeg");
        store.upsert_townland(&ancestors, townland).await.unwrap();
        store.checkpoint().await.unwrap();
    }

    let store = RedbTownlandStore::open(config).unwrap();
    let townlands = store.townlands().await.unwrap();
    assert_eq!(townlands.len(), 1);
    assert_eq!(townlands[0].name, "Ballybeg");
    assert_eq!(
        store.admin_units(AdminKind::County).await.unwrap()[0].name.as_deref(),
        Some("Wicklow")
    );
}
