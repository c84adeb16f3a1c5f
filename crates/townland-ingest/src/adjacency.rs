//! Adjacency Ingestion Pipeline
//!
//! Reads directed touch records `(t1_osm_id, t2_osm_id, direction, length_m)`
//! and stores one edge per ordered pair. Endpoints are looked up in the
//! attribute id space; a record naming a townland that is not loaded is
//! skipped and reported.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use tracing::{debug, info, instrument, warn};

use townland_core::{IdentityResolver, TouchEdge, TownlandKey};
use townland_storage::{StorageError, TownlandStore};

use crate::attributes::locate;
use crate::config::AdjacencyLoadConfig;
use crate::error::IngestError;
use crate::parse::{self, Columns};
use crate::report::{AdjacencyLoadSummary, RejectReason};

/// Columns the touch table must carry
pub const TOUCH_HEADERS: [&str; 4] = ["t1_osm_id", "t2_osm_id", "direction", "length_m"];

/// One touch row with raw (unresolved) endpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchRecord {
    pub src: i64,
    pub dst: i64,
    pub bearing: f64,
    pub shared_length_m: f64,
}

impl TouchRecord {
    /// Parse a CSV row; every field is required
    pub fn from_row(columns: &Columns, row: &StringRecord) -> Result<Self, String> {
        let get = |header: &str| columns.get(row, header);
        Ok(Self {
            src: parse::int(get("t1_osm_id")).ok_or("missing or unparseable t1_osm_id")?,
            dst: parse::int(get("t2_osm_id")).ok_or("missing or unparseable t2_osm_id")?,
            bearing: parse::float(get("direction")).ok_or("missing or unparseable direction")?,
            shared_length_m: parse::float(get("length_m"))
                .ok_or("missing or unparseable length_m")?,
        })
    }
}

/// Loads touch records into the store
pub struct AdjacencyPipeline<S> {
    store: Arc<S>,
    config: AdjacencyLoadConfig,
    resolver: IdentityResolver,
}

/// Outcome of a single record
enum TouchOutcome {
    Loaded { mirrored: bool },
    Unresolved(TownlandKey),
}

impl<S: TownlandStore> AdjacencyPipeline<S> {
    pub fn new(store: Arc<S>, config: AdjacencyLoadConfig) -> Self {
        Self {
            store,
            config,
            resolver: IdentityResolver::new(),
        }
    }

    /// Load a touch CSV file
    #[instrument(skip(self), fields(path = %path.display(), symmetrize = self.config.symmetrize))]
    pub async fn load_path(&self, path: &Path) -> Result<AdjacencyLoadSummary, IngestError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_reader(&source_name, bytes.as_slice()).await
    }

    /// Load touch rows from any reader
    pub async fn load_reader<R: Read + Send>(
        &self,
        source_name: &str,
        reader: R,
    ) -> Result<AdjacencyLoadSummary, IngestError> {
        let mut csv = csv::Reader::from_reader(reader);
        let columns = Columns::new(csv.headers().map_err(|e| IngestError::csv(source_name, e))?);
        let missing = columns.missing(&TOUCH_HEADERS);
        if !missing.is_empty() {
            return Err(IngestError::MissingHeaders {
                source_name: source_name.to_string(),
                missing,
            });
        }

        let mut summary = AdjacencyLoadSummary::default();
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

            let record = match TouchRecord::from_row(&columns, &row) {
                Ok(record) => record,
                Err(detail) => {
                    debug!(row = %locator, reason = %detail, "Rejecting touch row");
                    summary.report.reject(locator, RejectReason::Malformed, detail);
                    continue;
                }
            };

            match self.ingest_record(record).await {
                Ok(TouchOutcome::Loaded { mirrored }) => {
                    summary.report.loaded += 1;
                    if mirrored {
                        summary.mirrored += 1;
                    }
                }
                Ok(TouchOutcome::Unresolved(key)) => {
                    debug!(row = %locator, key = %key, "Skipping touch with unknown townland");
                    summary.report.reject(
                        locator,
                        RejectReason::UnresolvedReference,
                        format!("townland {key} is not loaded"),
                    );
                }
                Err(RecordFailure::Malformed(detail)) => {
                    summary.report.reject(locator, RejectReason::Malformed, detail);
                }
                Err(RecordFailure::Storage(e)) => return Err(e.into()),
            }

            if summary.report.read % self.config.batch_size == 0 {
                self.store.checkpoint().await?;
                info!(rows = summary.report.read, "Processed touch rows");
            }
        }

        self.store.checkpoint().await?;
        info!(
            rows = summary.report.read,
            loaded = summary.report.loaded,
            skipped = summary.report.skipped(),
            mirrored = summary.mirrored,
            "Touch load complete"
        );
        Ok(summary)
    }

    /// Resolve and store one record, plus its mirror when symmetrising
    ///
    /// An explicit record always replaces. A mirror replaces an earlier
    /// mirror but never an explicit edge, so the final edge set does not
    /// depend on record order and follows changed input on reload.
    async fn ingest_record(&self, record: TouchRecord) -> Result<TouchOutcome, RecordFailure> {
        let src = self.resolver.resolve_numeric(record.src);
        let dst = self.resolver.resolve_numeric(record.dst);
        for key in [src, dst] {
            if !self.store.contains_townland(key).await? {
                return Ok(TouchOutcome::Unresolved(key));
            }
        }

        let edge = TouchEdge::new(src, dst, record.bearing, record.shared_length_m)
            .map_err(|e| RecordFailure::Malformed(e.to_string()))?;

        match self.store.upsert_touch(&edge).await {
            Ok(()) => {}
            Err(StorageError::MissingTownland(key)) => return Ok(TouchOutcome::Unresolved(key)),
            Err(e) => return Err(e.into()),
        }

        let mirrored = if self.config.symmetrize {
            self.store.upsert_mirror_touch(&edge.reversed()).await?
        } else {
            false
        };
        Ok(TouchOutcome::Loaded { mirrored })
    }
}

enum RecordFailure {
    Malformed(String),
    Storage(StorageError),
}

impl From<StorageError> for RecordFailure {
    fn from(err: StorageError) -> Self {
        RecordFailure::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use townland_core::{CompassBucket, Townland};
    use townland_storage::InMemoryTownlandStore;

    async fn store_with(keys: &[i64]) -> Arc<InMemoryTownlandStore> {
        let store = Arc::new(InMemoryTownlandStore::new());
        for &key in keys {
            store
                .upsert_townland(&[], Townland::new(TownlandKey(key), format!("T{key}")))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_second_record_replaces_first() {
        let store = store_with(&[1, 2]).await;
        let pipeline = AdjacencyPipeline::new(store.clone(), AdjacencyLoadConfig::default());
        let csv = "t1_osm_id,t2_osm_id,direction,length_m\n1,2,0.0,150.0\n1,2,180.0,200.0\n";

        let summary = pipeline.load_reader("touch.csv", csv.as_bytes()).await.unwrap();
        assert_eq!(summary.report.loaded, 2);

        let edge = store.touch(TownlandKey(1), TownlandKey(2)).await.unwrap().unwrap();
        assert_eq!(edge.bearing, 180.0);
        assert_eq!(edge.bucket, CompassBucket::S);
        assert_eq!(edge.shared_length_m, 200.0);
        assert_eq!(store.stats().await.unwrap().touches, 1);
    }

    #[tokio::test]
    async fn test_default_leaves_graph_directed() {
        let store = store_with(&[1, 2]).await;
        let pipeline = AdjacencyPipeline::new(store.clone(), AdjacencyLoadConfig::default());
        let csv = "t1_osm_id,t2_osm_id,direction,length_m\n1,2,90,10\n";

        pipeline.load_reader("touch.csv", csv.as_bytes()).await.unwrap();
        assert!(store.touch(TownlandKey(2), TownlandKey(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_symmetrize_is_order_independent() {
        let rows = ["1,2,90,10", "2,1,250,12"];
        let mut finals = Vec::new();
        for order in [[0, 1], [1, 0]] {
            let store = store_with(&[1, 2]).await;
            let pipeline = AdjacencyPipeline::new(
                store.clone(),
                AdjacencyLoadConfig::default().with_symmetrize(true),
            );
            let csv = format!(
                "t1_osm_id,t2_osm_id,direction,length_m\n{}\n{}\n",
                rows[order[0]], rows[order[1]]
            );
            pipeline.load_reader("touch.csv", csv.as_bytes()).await.unwrap();
            finals.push((
                store.touch(TownlandKey(1), TownlandKey(2)).await.unwrap(),
                store.touch(TownlandKey(2), TownlandKey(1)).await.unwrap(),
            ));
        }
        assert_eq!(finals[0], finals[1]);
        assert_eq!(finals[0].1.as_ref().unwrap().bearing, 250.0);
    }

    #[tokio::test]
    async fn test_mirror_bearing_is_opposite() {
        let store = store_with(&[1, 2]).await;
        let pipeline = AdjacencyPipeline::new(
            store.clone(),
            AdjacencyLoadConfig::default().with_symmetrize(true),
        );
        let csv = "t1_osm_id,t2_osm_id,direction,length_m\n1,2,300,40\n";

        let summary = pipeline.load_reader("touch.csv", csv.as_bytes()).await.unwrap();
        assert_eq!(summary.mirrored, 1);

        let mirror = store.touch(TownlandKey(2), TownlandKey(1)).await.unwrap().unwrap();
        assert_eq!(mirror.bearing, 120.0);
        assert_eq!(mirror.bucket, CompassBucket::SE);
        assert_eq!(mirror.shared_length_m, 40.0);
    }

    #[tokio::test]
    async fn test_reload_refreshes_mirror() {
        let store = store_with(&[1, 2]).await;
        let pipeline = AdjacencyPipeline::new(
            store.clone(),
            AdjacencyLoadConfig::default().with_symmetrize(true),
        );
        let header = "t1_osm_id,t2_osm_id,direction,length_m\n";

        let first = format!("{header}1,2,90,10\n");
        pipeline.load_reader("touch.csv", first.as_bytes()).await.unwrap();
        let changed = format!("{header}1,2,0,50\n");
        let summary = pipeline.load_reader("touch.csv", changed.as_bytes()).await.unwrap();
        assert_eq!(summary.mirrored, 1);

        let forward = store.touch(TownlandKey(1), TownlandKey(2)).await.unwrap().unwrap();
        assert_eq!(forward.bearing, 0.0);
        assert!(!forward.mirrored);
        let mirror = store.touch(TownlandKey(2), TownlandKey(1)).await.unwrap().unwrap();
        assert_eq!(mirror.bearing, 180.0);
        assert_eq!(mirror.shared_length_m, 50.0);
        assert!(mirror.mirrored);
        assert_eq!(store.stats().await.unwrap().touches, 2);
    }

    #[tokio::test]
    async fn test_rejections_are_classified() {
        let store = store_with(&[1, 2]).await;
        let pipeline = AdjacencyPipeline::new(store.clone(), AdjacencyLoadConfig::default());
        let csv = "t1_osm_id,t2_osm_id,direction,length_m\n\
                   1,99,0,1\n\
                   1,2,,1\n\
                   1,2,NaN,1\n\
                   1,2,45,-3\n\
                   1,2,-45,3\n";

        let summary = pipeline.load_reader("touch.csv", csv.as_bytes()).await.unwrap();
        let report = &summary.report;
        assert_eq!(report.read, 5);
        assert_eq!(report.loaded, 1);
        assert_eq!(report.count(RejectReason::UnresolvedReference), 1);
        assert_eq!(report.count(RejectReason::Malformed), 3);
        assert_eq!(report.rejections[0].locator, "touch.csv:2");

        let edge = store.touch(TownlandKey(1), TownlandKey(2)).await.unwrap().unwrap();
        assert_eq!(edge.bearing, 315.0);
        assert_eq!(edge.bucket, CompassBucket::NW);
    }

    #[tokio::test]
    async fn test_missing_header_aborts() {
        let store = store_with(&[]).await;
        let pipeline = AdjacencyPipeline::new(store, AdjacencyLoadConfig::default());
        let err = pipeline
            .load_reader("touch.csv", "a,b\n1,2\n".as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingHeaders { .. }));
    }
}
