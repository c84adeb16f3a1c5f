//! Coordinate references known to the store

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::SpatialError;

/// A coordinate reference a polygon source may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// WGS 84 longitude/latitude (EPSG:4326)
    Wgs84,
    /// Irish Transverse Mercator (EPSG:2157)
    IrishTransverseMercator,
    /// TM75 Irish Grid (EPSG:29903)
    IrishGrid,
}

impl Crs {
    /// Look up a reference by EPSG code
    pub fn from_epsg(code: u32) -> Result<Self, SpatialError> {
        match code {
            4326 => Ok(Crs::Wgs84),
            2157 => Ok(Crs::IrishTransverseMercator),
            29903 => Ok(Crs::IrishGrid),
            other => Err(SpatialError::UnsupportedCrs(other)),
        }
    }

    /// EPSG code
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::IrishTransverseMercator => 2157,
            Crs::IrishGrid => 29903,
        }
    }

    /// Whether coordinates are angular (degrees on input, radians inside proj4rs)
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// PROJ.4 definition string
    pub fn proj_string(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs",
            Crs::IrishTransverseMercator => concat!(
                "+proj=tmerc +lat_0=53.5 +lon_0=-8 +k=0.99982 +x_0=600000 +y_0=750000 ",
                "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
            ),
            Crs::IrishGrid => concat!(
                "+proj=tmerc +lat_0=53.5 +lon_0=-8 +k=1.000035 +x_0=200000 +y_0=250000 ",
                "+ellps=mod_airy +towgs84=482.5,-130.6,564.6,-1.042,-0.214,-0.631,8.15 ",
                "+units=m +no_defs"
            ),
        }
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
