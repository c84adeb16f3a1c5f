//! Point lookup and neighbour lookup over a TownlandStore
//!
//! The engine keeps an R-tree of polygon-set bounding boxes for each
//! projection. Candidates from the tree are confirmed against the stored
//! geometry, so the tree never decides an answer on its own.

use std::collections::BTreeSet;
use std::sync::Arc;

use geo::Intersects;
use geo_types::{Coord, Point, Rect};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, instrument};

use townland_core::{AdminKey, AdminKind, AdminUnit, TouchEdge, Townland, TownlandKey};
use townland_spatial::{EnvelopeIndex, GEOGRAPHIC, PROJECTED, Reprojector};
use townland_storage::{GeometryRecord, TownlandStore};

use crate::error::QueryError;
use crate::pattern::NamePattern;

/// A townland found by point lookup, joined to its ancestors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointLookup {
    pub townland: Townland,
    pub county: Option<AdminUnit>,
    pub barony: Option<AdminUnit>,
    pub civil_parish: Option<AdminUnit>,
    pub electoral_division: Option<AdminUnit>,
}

/// One touching townland
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbour {
    pub edge: TouchEdge,
    /// Primary name of the destination townland
    pub name: Option<String>,
}

/// All neighbours of one matched townland, in compass order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighbourSet {
    pub townland: Townland,
    pub neighbours: Vec<Neighbour>,
}

#[derive(Debug, Default)]
struct Indexes {
    projected: EnvelopeIndex<TownlandKey>,
    geographic: EnvelopeIndex<TownlandKey>,
}

/// Read-only query engine
pub struct QueryEngine<S> {
    store: Arc<S>,
    to_projected: Reprojector,
    indexes: RwLock<Indexes>,
}

impl<S: TownlandStore> QueryEngine<S> {
    /// Create an engine and index every stored geometry
    #[instrument(skip(store))]
    pub async fn open(store: Arc<S>) -> Result<Self, QueryError> {
        let engine = Self {
            store,
            to_projected: Reprojector::new(GEOGRAPHIC, PROJECTED)?,
            indexes: RwLock::new(Indexes::default()),
        };
        engine.refresh().await?;
        Ok(engine)
    }

    /// Rebuild both indexes from the store
    pub async fn refresh(&self) -> Result<(), QueryError> {
        let records = self.store.geometries().await?;
        let projected = EnvelopeIndex::build(records.iter().map(|r| (r.key, &r.projected)));
        let geographic = EnvelopeIndex::build(records.iter().map(|r| (r.key, &r.geographic)));
        info!(geometries = records.len(), "Indexed townland geometry");

        *self.indexes.write() = Indexes {
            projected,
            geographic,
        };
        Ok(())
    }

    /// Add or replace one geometry in the indexes
    pub fn index_geometry(&self, record: &GeometryRecord) {
        let mut indexes = self.indexes.write();
        indexes.projected.insert(record.key, &record.projected);
        indexes.geographic.insert(record.key, &record.geographic);
    }

    /// Number of indexed geometries
    pub fn indexed(&self) -> usize {
        self.indexes.read().projected.len()
    }

    /// The townland covering a longitude/latitude point, with its ancestors
    ///
    /// Points on a shared border resolve to the lowest townland key. A point
    /// outside every stored polygon yields `None`.
    #[instrument(skip(self))]
    pub async fn lookup_point(&self, lon: f64, lat: f64) -> Result<Option<PointLookup>, QueryError> {
        if !lon.is_finite()
            || !lat.is_finite()
            || !(-180.0..=180.0).contains(&lon)
            || !(-90.0..=90.0).contains(&lat)
        {
            return Err(QueryError::InvalidPoint { lon, lat });
        }

        let projected = self.to_projected.coord(Coord { x: lon, y: lat })?;
        let point = Point::from(projected);
        let candidates = self.indexes.read().projected.at_point(projected);
        debug!(candidates = candidates.len(), "Point lookup candidates");

        for key in candidates {
            let Some(record) = self.store.geometry(key).await? else {
                continue;
            };
            if !record.projected.intersects(&point) {
                continue;
            }
            let Some(townland) = self.store.townland(key).await? else {
                continue;
            };
            return Ok(Some(self.join_ancestors(townland).await?));
        }
        Ok(None)
    }

    async fn join_ancestors(&self, townland: Townland) -> Result<PointLookup, QueryError> {
        let ancestors = townland.ancestors;
        Ok(PointLookup {
            county: self.admin(AdminKind::County, ancestors.county).await?,
            barony: self.admin(AdminKind::Barony, ancestors.barony).await?,
            civil_parish: self.admin(AdminKind::CivilParish, ancestors.civil_parish).await?,
            electoral_division: self
                .admin(AdminKind::ElectoralDivision, ancestors.electoral_division)
                .await?,
            townland,
        })
    }

    async fn admin(
        &self,
        kind: AdminKind,
        key: Option<AdminKey>,
    ) -> Result<Option<AdminUnit>, QueryError> {
        match key {
            Some(key) => Ok(self.store.admin_unit(kind, key).await?),
            None => Ok(None),
        }
    }

    /// Townlands whose geographic polygons intersect a longitude/latitude box
    pub async fn townlands_in_box(
        &self,
        min: (f64, f64),
        max: (f64, f64),
    ) -> Result<Vec<TownlandKey>, QueryError> {
        let rect = Rect::new(Coord { x: min.0, y: min.1 }, Coord { x: max.0, y: max.1 });
        let candidates = self.indexes.read().geographic.intersecting(rect);

        let mut hits = Vec::new();
        for key in candidates {
            if let Some(record) = self.store.geometry(key).await? {
                if record.geographic.intersects(&rect) {
                    hits.push(key);
                }
            }
        }
        Ok(hits)
    }

    /// Neighbours of every townland whose name matches `pattern`
    ///
    /// Primary, Irish, English, and alternate names are all tried. When
    /// `county` is given, only townlands in a county of that name (ignoring
    /// case) are considered. Each matched townland gets its own list, sorted
    /// N, NE, E, SE, S, SW, W, NW and then by shared length, longest first.
    #[instrument(skip(self))]
    pub async fn neighbours(
        &self,
        pattern: &str,
        county: Option<&str>,
    ) -> Result<Vec<NeighbourSet>, QueryError> {
        let pattern = NamePattern::new(pattern);
        let counties = match county {
            Some(name) => Some(self.counties_named(name).await?),
            None => None,
        };

        let mut sets = Vec::new();
        for townland in self.store.townlands().await? {
            if !townland.names().any(|n| pattern.matches(n)) {
                continue;
            }
            if let Some(counties) = &counties {
                match townland.ancestors.county {
                    Some(c) if counties.contains(&c) => {}
                    _ => continue,
                }
            }

            let mut edges = self.store.touches_from(townland.key).await?;
            sort_by_direction(&mut edges);

            let mut neighbours = Vec::with_capacity(edges.len());
            for edge in edges {
                let name = self.store.townland(edge.dst).await?.map(|t| t.name);
                neighbours.push(Neighbour { edge, name });
            }
            sets.push(NeighbourSet {
                townland,
                neighbours,
            });
        }
        debug!(matched = sets.len(), "Neighbour lookup");
        Ok(sets)
    }

    async fn counties_named(&self, name: &str) -> Result<BTreeSet<AdminKey>, QueryError> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .store
            .admin_units(AdminKind::County)
            .await?
            .into_iter()
            .filter(|c| {
                c.name
                    .as_deref()
                    .is_some_and(|n| n.trim().to_lowercase() == wanted)
            })
            .map(|c| c.key)
            .collect())
    }
}

/// Compass order, then longest shared border first, then destination key
pub fn sort_by_direction(edges: &mut [TouchEdge]) {
    edges.sort_by(|a, b| {
        a.bucket
            .ordinal()
            .cmp(&b.bucket.ordinal())
            .then(b.shared_length_m.total_cmp(&a.shared_length_m))
            .then(a.dst.cmp(&b.dst))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{MultiPolygon, polygon};
    use townland_core::{Ancestors, CompassBucket};
    use townland_storage::InMemoryTownlandStore;

    fn edge(dst: i64, bearing: f64, length: f64) -> TouchEdge {
        TouchEdge::new(TownlandKey(1), TownlandKey(dst), bearing, length).unwrap()
    }

    /// ITM square with its south-west corner at (x, y)
    fn square(x: f64, y: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + side, y: y),
            (x: x + side, y: y + side),
            (x: x, y: y + side),
            (x: x, y: y),
        ]])
    }

    fn to_lon_lat(x: f64, y: f64) -> (f64, f64) {
        let c = Reprojector::new(PROJECTED, GEOGRAPHIC)
            .unwrap()
            .coord(Coord { x, y })
            .unwrap();
        (c.x, c.y)
    }

    async fn seeded_store() -> Arc<InMemoryTownlandStore> {
        let store = Arc::new(InMemoryTownlandStore::new());
        let wicklow = AdminUnit::new(AdminKind::County, AdminKey(1)).with_name("Wicklow");
        let kerry = AdminUnit::new(AdminKind::County, AdminKey(2)).with_name("Kerry");
        let parish = AdminUnit::new(AdminKind::CivilParish, AdminKey(30))
            .with_name("Rathdrum")
            .with_county(AdminKey(1));

        let in_wicklow = Ancestors {
            county: Some(AdminKey(1)),
            civil_parish: Some(AdminKey(30)),
            ..Default::default()
        };
        let in_kerry = Ancestors {
            county: Some(AdminKey(2)),
            ..Default::default()
        };

        let rows = [
            (100, "Ballybeg", in_wicklow, vec![wicklow.clone(), parish.clone()]),
            (101, "Ballymore", in_wicklow, vec![wicklow.clone(), parish]),
            (102, "Knockanree", in_wicklow, vec![wicklow]),
            (200, "Ballybeg", in_kerry, vec![kerry]),
        ];
        for (key, name, ancestors, units) in rows {
            let townland = Townland::new(TownlandKey(key), name).with_ancestors(ancestors);
            store.upsert_townland(&units, townland).await.unwrap();
        }

        store
            .upsert_geometry(TownlandKey(100), square(700_000.0, 690_000.0, 500.0), "{}".into(), None)
            .await
            .unwrap();
        store
            .upsert_geometry(TownlandKey(101), square(700_500.0, 690_000.0, 500.0), "{}".into(), None)
            .await
            .unwrap();

        for (src, dst, bearing, length) in [
            (100, 101, 90.0, 500.0),
            (100, 102, 0.0, 120.0),
            (100, 200, 10.0, 300.0),
            (101, 100, 270.0, 500.0),
        ] {
            let edge =
                TouchEdge::new(TownlandKey(src), TownlandKey(dst), bearing, length).unwrap();
            store.upsert_touch(&edge).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_point_lookup_joins_ancestors() {
        let engine = QueryEngine::open(seeded_store().await).await.unwrap();
        assert_eq!(engine.indexed(), 2);

        let (lon, lat) = to_lon_lat(700_750.0, 690_250.0);
        let hit = engine.lookup_point(lon, lat).await.unwrap().unwrap();
        assert_eq!(hit.townland.key, TownlandKey(101));
        assert_eq!(hit.county.unwrap().name.as_deref(), Some("Wicklow"));
        assert_eq!(hit.civil_parish.unwrap().name.as_deref(), Some("Rathdrum"));
        assert!(hit.barony.is_none());
        assert!(hit.electoral_division.is_none());
    }

    #[tokio::test]
    async fn test_point_outside_every_townland() {
        let engine = QueryEngine::open(seeded_store().await).await.unwrap();
        assert!(engine.lookup_point(-12.0, 52.0).await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_point_is_rejected() {
        tokio_test::block_on(async {
            let engine = QueryEngine::open(seeded_store().await).await.unwrap();
            for (lon, lat) in [(f64::NAN, 53.0), (-6.0, 95.0), (181.0, 53.0)] {
                assert!(matches!(
                    engine.lookup_point(lon, lat).await,
                    Err(QueryError::InvalidPoint { .. })
                ));
            }
        });
    }

    #[tokio::test]
    async fn test_overlap_resolves_to_lowest_key() {
        let store = seeded_store().await;
        store
            .upsert_geometry(TownlandKey(102), square(700_000.0, 690_000.0, 500.0), "{}".into(), None)
            .await
            .unwrap();
        let engine = QueryEngine::open(store).await.unwrap();

        let (lon, lat) = to_lon_lat(700_250.0, 690_250.0);
        let hit = engine.lookup_point(lon, lat).await.unwrap().unwrap();
        assert_eq!(hit.townland.key, TownlandKey(100));
    }

    #[tokio::test]
    async fn test_index_geometry_picks_up_new_rows() {
        let store = seeded_store().await;
        let engine = QueryEngine::open(store.clone()).await.unwrap();
        let (lon, lat) = to_lon_lat(701_250.0, 690_250.0);
        assert!(engine.lookup_point(lon, lat).await.unwrap().is_none());

        let record = store
            .upsert_geometry(TownlandKey(102), square(701_000.0, 690_000.0, 500.0), "{}".into(), None)
            .await
            .unwrap();
        engine.index_geometry(&record);

        let hit = engine.lookup_point(lon, lat).await.unwrap().unwrap();
        assert_eq!(hit.townland.key, TownlandKey(102));
    }

    #[tokio::test]
    async fn test_neighbours_in_compass_order() {
        let engine = QueryEngine::open(seeded_store().await).await.unwrap();
        let sets = engine.neighbours("ballybeg", Some("wicklow")).await.unwrap();
        assert_eq!(sets.len(), 1);

        let names: Vec<_> = sets[0]
            .neighbours
            .iter()
            .map(|n| (n.edge.bucket, n.name.clone().unwrap()))
            .collect();
        assert_eq!(
            names,
            vec![
                (CompassBucket::N, "Ballybeg".to_string()),
                (CompassBucket::N, "Knockanree".to_string()),
                (CompassBucket::E, "Ballymore".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_neighbours_without_county_filter() {
        let engine = QueryEngine::open(seeded_store().await).await.unwrap();

        let sets = engine.neighbours("ballybeg", None).await.unwrap();
        let keys: Vec<_> = sets.iter().map(|s| s.townland.key.get()).collect();
        assert_eq!(keys, vec![100, 200]);
        assert!(sets[1].neighbours.is_empty());

        let sets = engine.neighbours("bally%", Some("Kerry")).await.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].townland.key, TownlandKey(200));

        assert!(engine.neighbours("nowhere", None).await.unwrap().is_empty());
        assert!(engine.neighbours("%", Some("Cork")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_townlands_in_box() {
        let engine = QueryEngine::open(seeded_store().await).await.unwrap();
        let min = to_lon_lat(700_600.0, 690_100.0);
        let max = to_lon_lat(700_900.0, 690_400.0);
        let hits = engine.townlands_in_box(min, max).await.unwrap();
        assert_eq!(hits, vec![TownlandKey(101)]);
    }

    #[test]
    fn test_direction_order_with_length_tiebreak() {
        let mut edges = vec![
            edge(2, 350.0, 10.0),
            edge(3, 180.0, 50.0),
            edge(4, 5.0, 90.0),
            edge(5, 44.0, 10.0),
            edge(6, 185.0, 70.0),
        ];
        sort_by_direction(&mut edges);

        let order: Vec<_> = edges.iter().map(|e| (e.bucket, e.dst.get())).collect();
        assert_eq!(
            order,
            vec![
                (CompassBucket::N, 4),
                (CompassBucket::N, 2),
                (CompassBucket::NE, 5),
                (CompassBucket::S, 6),
                (CompassBucket::S, 3),
            ]
        );
    }
}
