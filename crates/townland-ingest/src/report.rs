//! Per-run reports
//!
//! Every pipeline makes as much progress as it can and returns a report of
//! what it loaded and what it rejected, with enough context to find each
//! rejected record in its source.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::Serialize;

use townland_core::{AdminKey, AdminKind};

/// Why a record was not loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RejectReason {
    /// Missing required field or unparseable identifier
    Malformed,
    /// References a townland that is not loaded
    UnresolvedReference,
    /// Geometry that cannot be repaired into a valid polygon set
    DegenerateGeometry,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Malformed => "malformed",
            RejectReason::UnresolvedReference => "unresolved_reference",
            RejectReason::DegenerateGeometry => "degenerate_geometry",
        }
    }
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Where the record sits in its source, e.g. `townlands.csv:17` or
    /// `wicklow.geojson#relation/100`
    pub locator: String,
    pub reason: RejectReason,
    /// Human-readable cause
    pub detail: String,
}

/// Counts and rejections for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records read from the input
    pub read: usize,
    /// Records written to the store
    pub loaded: usize,
    /// Records not written, in input order
    pub rejections: Vec<Rejection>,
}

impl IngestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejection
    pub fn reject(
        &mut self,
        locator: impl Into<String>,
        reason: RejectReason,
        detail: impl Into<String>,
    ) {
        self.rejections.push(Rejection {
            locator: locator.into(),
            reason,
            detail: detail.into(),
        });
    }

    /// Number of records not loaded
    pub fn skipped(&self) -> usize {
        self.rejections.len()
    }

    /// Number of rejections with a given reason
    pub fn count(&self, reason: RejectReason) -> usize {
        self.rejections.iter().filter(|r| r.reason == reason).count()
    }
}

/// Admin Hierarchy Loader run result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeLoadSummary {
    pub report: IngestReport,
    /// Distinct county keys seen
    pub counties: BTreeSet<AdminKey>,
    /// Distinct barony keys seen
    pub baronies: BTreeSet<AdminKey>,
    /// Distinct civil parish keys seen
    pub civil_parishes: BTreeSet<AdminKey>,
    /// Distinct electoral division keys seen
    pub electoral_divisions: BTreeSet<AdminKey>,
}

impl AttributeLoadSummary {
    pub(crate) fn saw(&mut self, kind: AdminKind, key: AdminKey) {
        let set = match kind {
            AdminKind::County => &mut self.counties,
            AdminKind::Barony => &mut self.baronies,
            AdminKind::CivilParish => &mut self.civil_parishes,
            AdminKind::ElectoralDivision => &mut self.electoral_divisions,
        };
        set.insert(key);
    }

    /// Distinct admin units seen for one kind
    pub fn distinct(&self, kind: AdminKind) -> usize {
        match kind {
            AdminKind::County => self.counties.len(),
            AdminKind::Barony => self.baronies.len(),
            AdminKind::CivilParish => self.civil_parishes.len(),
            AdminKind::ElectoralDivision => self.electoral_divisions.len(),
        }
    }
}

/// Geometry Ingestion Pipeline run result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeometryLoadSummary {
    pub report: IngestReport,
    /// Collections (files) processed
    pub files: usize,
    /// Loaded features whose geometry needed repair
    pub repaired: usize,
}

/// Adjacency Ingestion Pipeline run result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdjacencyLoadSummary {
    pub report: IngestReport,
    /// Reverse edges materialised by symmetrisation
    pub mirrored: usize,
}
