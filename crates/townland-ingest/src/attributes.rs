//! Admin Hierarchy Loader
//!
//! Reads the townland attribute table. Each row describes one townland and
//! embeds the id, name, and Logainm reference of its county, barony, civil
//! parish, and electoral division. The ancestors and the townland are written
//! in one store call, ancestors first.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use tracing::{debug, info, instrument, warn};

use townland_core::{
    AdminKey, AdminKind, AdminUnit, Ancestors, IdentityResolver, Provenance, Townland,
};
use townland_storage::TownlandStore;

use crate::config::AttributeLoadConfig;
use crate::error::IngestError;
use crate::parse::{self, Columns};
use crate::report::{AttributeLoadSummary, RejectReason};

/// Columns the attribute table must carry
#[rustfmt::skip]
pub const ATTRIBUTE_HEADERS: [&str; 27] = [
    "OSM_ID", "NAME_TAG", "NAME_GA", "NAME_EN", "ALT_NAME", "ALT_NAME_G",
    "OSM_USER", "OSM_TIMEST", "ATTRIBUTIO", "LOGAINM_RE",
    "CO_NAME", "CO_OSM_ID", "CO_LOGAINM",
    "CP_NAME", "CP_OSM_ID", "CP_LOGAINM",
    "ED_NAME", "ED_OSM_ID", "ED_LOGAINM",
    "BAR_NAME", "BAR_OSM_ID", "BAR_LOGAIN",
    "T_IE_URL", "AREA", "LATITUDE", "LONGITUDE", "EPOCH_TSTM",
];

/// Where one ancestor's (id, name, Logainm) triple lives in a row
struct AncestorColumns {
    kind: AdminKind,
    id: &'static str,
    name: &'static str,
    logainm: &'static str,
}

const ANCESTOR_COLUMNS: [AncestorColumns; 4] = [
    AncestorColumns {
        kind: AdminKind::County,
        id: "CO_OSM_ID",
        name: "CO_NAME",
        logainm: "CO_LOGAINM",
    },
    AncestorColumns {
        kind: AdminKind::Barony,
        id: "BAR_OSM_ID",
        name: "BAR_NAME",
        logainm: "BAR_LOGAIN",
    },
    AncestorColumns {
        kind: AdminKind::CivilParish,
        id: "CP_OSM_ID",
        name: "CP_NAME",
        logainm: "CP_LOGAINM",
    },
    AncestorColumns {
        kind: AdminKind::ElectoralDivision,
        id: "ED_OSM_ID",
        name: "ED_NAME",
        logainm: "ED_LOGAINM",
    },
];

/// One attribute row, ready to upsert
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    /// Ancestors present in the row, county first
    pub ancestors: Vec<AdminUnit>,
    pub townland: Townland,
}

impl AttributeRecord {
    /// Build a record from a CSV row
    ///
    /// A row without a usable townland id or primary name is malformed;
    /// blank ancestor ids simply leave that link empty.
    pub fn from_row(
        columns: &Columns,
        row: &StringRecord,
        resolver: &IdentityResolver,
    ) -> Result<Self, String> {
        let get = |header: &str| columns.get(row, header);

        let raw_id = parse::int(get("OSM_ID")).ok_or("missing or unparseable OSM_ID")?;
        let key = resolver.resolve_numeric(raw_id);
        let name = parse::text(get("NAME_TAG")).ok_or("missing NAME_TAG")?;

        let mut ancestors = Vec::with_capacity(4);
        let mut links = Ancestors::default();
        for ancestor in &ANCESTOR_COLUMNS {
            let Some(id) = parse::int(get(ancestor.id)) else {
                continue;
            };
            let mut unit = AdminUnit::new(ancestor.kind, AdminKey(id));
            unit.name = parse::text(get(ancestor.name));
            unit.logainm_ref = parse::text(get(ancestor.logainm));
            if ancestor.kind == AdminKind::Barony {
                unit.county = links.county;
            }
            links.set(ancestor.kind, Some(unit.key));
            ancestors.push(unit);
        }

        let mut townland = Townland::new(key, name).with_ancestors(links);
        townland.name_ga = parse::text(get("NAME_GA"));
        townland.name_en = parse::text(get("NAME_EN"));
        townland.alt_name = parse::text(get("ALT_NAME"));
        townland.alt_name_ga = parse::text(get("ALT_NAME_G"));
        townland.url = parse::text(get("T_IE_URL"));
        townland.area = parse::float(get("AREA"));
        townland.latitude = parse::float(get("LATITUDE"));
        townland.longitude = parse::float(get("LONGITUDE"));
        townland.logainm_ref = parse::text(get("LOGAINM_RE"));
        townland.provenance = Provenance {
            editor: parse::text(get("OSM_USER")),
            edited_at: parse::timestamp(get("OSM_TIMEST")),
            attribution: parse::text(get("ATTRIBUTIO")),
            epoch: parse::int(get("EPOCH_TSTM")),
        };

        Ok(Self {
            ancestors,
            townland,
        })
    }
}

/// `source:line` for a CSV position
pub(crate) fn locate(source_name: &str, position: Option<&csv::Position>) -> String {
    match position {
        Some(position) => format!("{}:{}", source_name, position.line()),
        None => source_name.to_string(),
    }
}

/// Loads the attribute table into the store
pub struct AdminHierarchyLoader<S> {
    store: Arc<S>,
    config: AttributeLoadConfig,
    resolver: IdentityResolver,
}

impl<S: TownlandStore> AdminHierarchyLoader<S> {
    pub fn new(store: Arc<S>, config: AttributeLoadConfig) -> Self {
        Self {
            store,
            config,
            resolver: IdentityResolver::new(),
        }
    }

    /// Load an attribute CSV file
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn load_path(&self, path: &Path) -> Result<AttributeLoadSummary, IngestError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_reader(&source_name, bytes.as_slice()).await
    }

    /// Load attribute rows from any reader
    ///
    /// Headers are checked before anything is written.
    pub async fn load_reader<R: Read + Send>(
        &self,
        source_name: &str,
        reader: R,
    ) -> Result<AttributeLoadSummary, IngestError> {
        let mut csv = csv::Reader::from_reader(reader);
        let columns = Columns::new(csv.headers().map_err(|e| IngestError::csv(source_name, e))?);
        let missing = columns.missing(&ATTRIBUTE_HEADERS);
        if !missing.is_empty() {
            return Err(IngestError::MissingHeaders {
                source_name: source_name.to_string(),
                missing,
            });
        }

        let mut summary = AttributeLoadSummary::default();
        let mut row = StringRecord::new();
        loop {
            match csv.read_record(&mut row) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.is_io_error() => return Err(IngestError::csv(source_name, e)),
                Err(e) => {
                    summary.report.read += 1;
                    let locator = locate(source_name, e.position());
                    warn!(row = %locator, error = %e, "Rejecting unreadable row");
                    summary.report.reject(locator, RejectReason::Malformed, e.to_string());
                    continue;
                }
            }
            summary.report.read += 1;
            let locator = locate(source_name, row.position());

            let record = match AttributeRecord::from_row(&columns, &row, &self.resolver) {
                Ok(record) => record,
                Err(detail) => {
                    debug!(row = %locator, reason = %detail, "Rejecting attribute row");
                    summary.report.reject(locator, RejectReason::Malformed, detail);
                    continue;
                }
            };

            for unit in &record.ancestors {
                summary.saw(unit.kind, unit.key);
            }
            self.store
                .upsert_townland(&record.ancestors, record.townland)
                .await?;
            summary.report.loaded += 1;

            if summary.report.read % self.config.batch_size == 0 {
                self.store.checkpoint().await?;
                info!(rows = summary.report.read, "Processed attribute rows");
            }
        }

        self.store.checkpoint().await?;
        info!(
            rows = summary.report.read,
            loaded = summary.report.loaded,
            skipped = summary.report.skipped(),
            counties = summary.counties.len(),
            baronies = summary.baronies.len(),
            civil_parishes = summary.civil_parishes.len(),
            electoral_divisions = summary.electoral_divisions.len(),
            "Attribute load complete"
        );
        Ok(summary)
    }
}
