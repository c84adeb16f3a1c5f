//! Reprojection between coordinate references
//!
//! proj4rs works in radians for geographic references; callers always pass
//! and receive degrees.

use std::fmt;
use std::sync::Arc;

use geo::MapCoords;
use geo_types::{Coord, MultiPolygon};
use proj4rs::Proj;

use crate::crs::Crs;
use crate::error::SpatialError;

/// Transforms coordinates from one reference to another
///
/// Both projection definitions are parsed once, in [`Reprojector::new`].
/// Clones and [`Reprojector::inverse`] share them.
#[derive(Clone)]
pub struct Reprojector {
    src: Crs,
    dst: Crs,
    src_proj: Arc<Proj>,
    dst_proj: Arc<Proj>,
}

impl Reprojector {
    /// Create a reprojector, parsing both definitions
    pub fn new(src: Crs, dst: Crs) -> Result<Self, SpatialError> {
        Ok(Self {
            src,
            dst,
            src_proj: Arc::new(Proj::from_proj_string(src.proj_string())?),
            dst_proj: Arc::new(Proj::from_proj_string(dst.proj_string())?),
        })
    }

    pub fn source(&self) -> Crs {
        self.src
    }

    pub fn target(&self) -> Crs {
        self.dst
    }

    /// The inverse transform
    pub fn inverse(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
            src_proj: Arc::clone(&self.dst_proj),
            dst_proj: Arc::clone(&self.src_proj),
        }
    }

    fn is_identity(&self) -> bool {
        self.src == self.dst
    }

    /// Transform a single coordinate
    pub fn coord(&self, c: Coord<f64>) -> Result<Coord<f64>, SpatialError> {
        if self.is_identity() {
            return Ok(c);
        }
        transform_coord(
            &self.src_proj,
            &self.dst_proj,
            self.src.is_geographic(),
            self.dst.is_geographic(),
            c,
        )
    }

    /// Transform every vertex of a polygon set
    pub fn multi_polygon(&self, geom: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, SpatialError> {
        if self.is_identity() {
            return Ok(geom.clone());
        }
        let (src, dst) = (self.src_proj.as_ref(), self.dst_proj.as_ref());
        let (src_geo, dst_geo) = (self.src.is_geographic(), self.dst.is_geographic());
        geom.try_map_coords(|c| transform_coord(src, dst, src_geo, dst_geo, c))
    }
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .finish()
    }
}

impl PartialEq for Reprojector {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.dst == other.dst
    }
}

fn transform_coord(
    src: &Proj,
    dst: &Proj,
    src_geographic: bool,
    dst_geographic: bool,
    c: Coord<f64>,
) -> Result<Coord<f64>, SpatialError> {
    if !c.x.is_finite() || !c.y.is_finite() {
        return Err(SpatialError::projection(format!(
            "non-finite coordinate ({}, {})",
            c.x, c.y
        )));
    }

    let mut point = if src_geographic {
        (c.x.to_radians(), c.y.to_radians(), 0.0)
    } else {
        (c.x, c.y, 0.0)
    };
    proj4rs::transform::transform(src, dst, &mut point)?;

    let (x, y) = if dst_geographic {
        (point.0.to_degrees(), point.1.to_degrees())
    } else {
        (point.0, point.1)
    };
    if !x.is_finite() || !y.is_finite() {
        return Err(SpatialError::projection(format!(
            "transform of ({}, {}) produced a non-finite result",
            c.x, c.y
        )));
    }
    Ok(Coord { x, y })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    // ITM false origin sits at 53.5N 8W.
    #[test]
    fn test_itm_false_origin() {
        let to_itm = Reprojector::new(Crs::Wgs84, Crs::IrishTransverseMercator).unwrap();
        let origin = to_itm.coord(Coord { x: -8.0, y: 53.5 }).unwrap();
        assert!((origin.x - 600_000.0).abs() < 0.01, "x = {}", origin.x);
        assert!((origin.y - 750_000.0).abs() < 0.01, "y = {}", origin.y);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let to_itm = Reprojector::new(Crs::Wgs84, Crs::IrishTransverseMercator).unwrap();
        let back = to_itm.inverse();

        let dublin = Coord { x: -6.2603, y: 53.3498 };
        let projected = to_itm.coord(dublin).unwrap();
        let recovered = back.coord(projected).unwrap();
        assert!((recovered.x - dublin.x).abs() < 1e-8);
        assert!((recovered.y - dublin.y).abs() < 1e-8);
    }

    #[test]
    fn test_polygon_transform_matches_pointwise() {
        let to_itm = Reprojector::new(Crs::Wgs84, Crs::IrishTransverseMercator).unwrap();
        let square = MultiPolygon::new(vec![polygon![
            (x: -8.01, y: 53.49),
            (x: -7.99, y: 53.49),
            (x: -7.99, y: 53.51),
            (x: -8.01, y: 53.51),
            (x: -8.01, y: 53.49),
        ]]);

        let projected = to_itm.multi_polygon(&square).unwrap();
        let first = projected.0[0].exterior().0[0];
        let expected = to_itm.coord(Coord { x: -8.01, y: 53.49 }).unwrap();
        assert_eq!(first, expected);
    }

    #[test]
    fn test_inverse_shares_parsed_definitions() {
        let to_itm = Reprojector::new(Crs::Wgs84, Crs::IrishTransverseMercator).unwrap();
        let back = to_itm.inverse();
        assert!(Arc::ptr_eq(&to_itm.src_proj, &back.dst_proj));
        assert!(Arc::ptr_eq(&to_itm.dst_proj, &back.src_proj));
        assert_eq!(back.inverse(), to_itm);
    }

    #[test]
    fn test_identity_is_untouched() {
        let same = Reprojector::new(Crs::Wgs84, Crs::Wgs84).unwrap();
        let c = Coord { x: -9.05, y: 53.27 };
        assert_eq!(same.coord(c).unwrap(), c);
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let to_itm = Reprojector::new(Crs::Wgs84, Crs::IrishTransverseMercator).unwrap();
        assert!(to_itm.coord(Coord { x: f64::NAN, y: 53.0 }).is_err());
    }
}
