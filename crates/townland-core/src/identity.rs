//! Canonical keys and identity resolution
//!
//! Three sources feed the store and each names townlands its own way:
//!
//! - the attribute table carries a numeric id that *is* the canonical key
//! - the adjacency table carries numeric ids from the same space
//! - polygon features carry a string id of the form `"<kind>/<digits>"`
//!
//! Positive keys come from the attribute table; negative keys come from
//! polygon relation ids. [`GeometryIdConvention`] selects how polygon ids map,
//! since other polygon sources may number their features differently.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Canonical key of a townland
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TownlandKey(pub i64);

impl TownlandKey {
    /// Create a key from its raw value
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this key came from a polygon relation id
    pub const fn is_relation_derived(self) -> bool {
        self.0 < 0
    }
}

impl Display for TownlandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical key of an admin unit (unique within one [`crate::AdminKind`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdminKey(pub i64);

impl AdminKey {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw identifier tagged with the dataset it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource<'a> {
    /// Numeric id from the attribute table
    Attribute(i64),
    /// Numeric id from the adjacency table
    Adjacency(i64),
    /// String id from a polygon feature, `"<kind>/<digits>"`
    Geometry(&'a str),
}

/// How polygon feature ids map onto the canonical key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryIdConvention {
    /// `"relation/123"` maps to `-123`
    #[default]
    NegatedRelation,
    /// `"relation/123"` maps to `123`, for collections keyed by attribute ids
    AttributeId,
}

/// Pure mapping from tagged raw identifiers to canonical townland keys
///
/// Existence checks (does a townland with this key exist?) are the caller's
/// job; the resolver never touches storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver {
    convention: GeometryIdConvention,
}

impl IdentityResolver {
    /// Create a resolver with the default polygon-id convention
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with an explicit polygon-id convention
    pub fn with_convention(convention: GeometryIdConvention) -> Self {
        Self { convention }
    }

    /// Resolve an attribute or adjacency id; both already live in the
    /// attribute key space
    pub fn resolve_numeric(&self, raw: i64) -> TownlandKey {
        TownlandKey(raw)
    }

    /// The polygon-id convention in effect
    pub fn convention(&self) -> GeometryIdConvention {
        self.convention
    }

    /// Resolve a tagged raw identifier to a canonical key
    pub fn resolve(&self, source: IdSource<'_>) -> Result<TownlandKey, IdentityError> {
        match source {
            IdSource::Attribute(raw) | IdSource::Adjacency(raw) => Ok(self.resolve_numeric(raw)),
            IdSource::Geometry(feature_id) => {
                let n = relation_number(feature_id)?;
                let raw = i64::try_from(n)
                    .map_err(|_| IdentityError::OutOfRange(feature_id.to_string()))?;
                Ok(match self.convention {
                    GeometryIdConvention::NegatedRelation => TownlandKey(-raw),
                    GeometryIdConvention::AttributeId => TownlandKey(raw),
                })
            }
        }
    }
}

/// Extract the unsigned digit suffix of a `"<kind>/<digits>"` identifier
fn relation_number(feature_id: &str) -> Result<u64, IdentityError> {
    let trimmed = feature_id.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Empty);
    }

    let invalid = || IdentityError::InvalidShape(feature_id.to_string());
    let (kind, digits) = trimmed.split_once('/').ok_or_else(invalid)?;
    if kind.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u64>()
        .map_err(|_| IdentityError::OutOfRange(feature_id.to_string()))
}
