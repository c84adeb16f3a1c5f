//! Directed touch edges and compass buckets

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::identity::TownlandKey;

/// One of eight 45° compass sectors, centred on the cardinal and
/// intercardinal directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompassBucket {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassBucket {
    /// Buckets in clockwise order starting at north
    pub const CLOCKWISE: [CompassBucket; 8] = [
        CompassBucket::N,
        CompassBucket::NE,
        CompassBucket::E,
        CompassBucket::SE,
        CompassBucket::S,
        CompassBucket::SW,
        CompassBucket::W,
        CompassBucket::NW,
    ];

    /// Bucket for a bearing in degrees clockwise from north
    ///
    /// The bearing is taken modulo 360. Sector boundaries sit at 22.5°,
    /// 67.5°, ... and belong to the clockwise sector.
    pub fn from_bearing(degrees: f64) -> Self {
        let d = normalize_bearing(degrees);
        // Shift by half a sector so N covers [337.5, 22.5).
        let sector = ((d + 22.5) / 45.0).floor() as usize % 8;
        Self::CLOCKWISE[sector]
    }

    /// Position in the clockwise cycle (N = 0)
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompassBucket::N => "N",
            CompassBucket::NE => "NE",
            CompassBucket::E => "E",
            CompassBucket::SE => "SE",
            CompassBucket::S => "S",
            CompassBucket::SW => "SW",
            CompassBucket::W => "W",
            CompassBucket::NW => "NW",
        }
    }
}

impl Display for CompassBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompassBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CLOCKWISE
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown compass bucket: {s}"))
    }
}

/// Reduce any finite bearing into `[0, 360)`
pub fn normalize_bearing(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can round tiny negative inputs up to exactly 360.0
    if d >= 360.0 { 0.0 } else { d }
}

/// A directed "shares a border with" edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEdge {
    /// Source townland
    pub src: TownlandKey,
    /// Destination townland
    pub dst: TownlandKey,
    /// Bearing from source to destination, degrees clockwise from north, in `[0, 360)`
    pub bearing: f64,
    /// Compass bucket derived from `bearing`
    pub bucket: CompassBucket,
    /// Shared border length in meters
    pub shared_length_m: f64,
    /// Derived from the reverse edge rather than read from input
    pub mirrored: bool,
}

impl TouchEdge {
    /// Build an edge, normalising the bearing and deriving its bucket
    pub fn new(
        src: TownlandKey,
        dst: TownlandKey,
        bearing: f64,
        shared_length_m: f64,
    ) -> Result<Self, RecordError> {
        if !bearing.is_finite() {
            return Err(RecordError::NonFiniteBearing(bearing));
        }
        if !(shared_length_m >= 0.0) || !shared_length_m.is_finite() {
            return Err(RecordError::InvalidLength(shared_length_m));
        }

        let bearing = normalize_bearing(bearing);
        Ok(Self {
            src,
            dst,
            bearing,
            bucket: CompassBucket::from_bearing(bearing),
            shared_length_m,
            mirrored: false,
        })
    }

    /// The edge seen from the other side: swapped endpoints, bearing + 180°
    ///
    /// The result is marked as mirrored.
    pub fn reversed(&self) -> Self {
        let bearing = normalize_bearing(self.bearing + 180.0);
        Self {
            src: self.dst,
            dst: self.src,
            bearing,
            bucket: CompassBucket::from_bearing(bearing),
            shared_length_m: self.shared_length_m,
            mirrored: true,
        }
    }
}
