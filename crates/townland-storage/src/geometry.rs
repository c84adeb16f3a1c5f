//! Stored townland geometry

use std::sync::OnceLock;

use geo::Area;
use serde::{Deserialize, Serialize};

use townland_core::TownlandKey;
use townland_spatial::{GEOGRAPHIC, MultiPolygon, PROJECTED, Reprojector, SpatialError};

use crate::error::StorageError;

static TO_GEOGRAPHIC: OnceLock<Result<Reprojector, SpatialError>> = OnceLock::new();

/// Shared projected-to-geographic transform, parsed on first use
fn to_geographic() -> Result<&'static Reprojector, StorageError> {
    TO_GEOGRAPHIC
        .get_or_init(|| Reprojector::new(PROJECTED, GEOGRAPHIC))
        .as_ref()
        .map_err(|e| StorageError::from(e.clone()))
}

/// Dual-projection geometry of one townland
///
/// Only `projected` is ever written by callers. `geographic` and `area_m2`
/// are recomputed from it on every write, so the two projections cannot
/// drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// Owning townland
    pub key: TownlandKey,
    /// Polygon set in Irish Transverse Mercator
    pub projected: MultiPolygon<f64>,
    /// The same polygon set in WGS 84 longitude/latitude
    pub geographic: MultiPolygon<f64>,
    /// Planar area of `projected`, square meters
    pub area_m2: f64,
    /// The full source feature, as GeoJSON text
    pub source_feature: String,
}

impl GeometryRecord {
    /// Build a record from its canonical projection
    pub fn derive(
        key: TownlandKey,
        projected: MultiPolygon<f64>,
        source_feature: String,
    ) -> Result<Self, StorageError> {
        let geographic = to_geographic()?.multi_polygon(&projected)?;
        let area_m2 = projected.unsigned_area();
        Ok(Self {
            key,
            projected,
            geographic,
            area_m2,
            source_feature,
        })
    }
}
