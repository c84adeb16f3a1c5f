//! Geometry Ingestion Pipeline
//!
//! Consumes GeoJSON feature collections (normally one per county). Each
//! feature is resolved to a townland, reprojected into the projected
//! reference, repaired, normalised to a polygon set, and stored together
//! with its full source feature. The serving copy is derived by the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geojson::{Feature, GeoJson, feature};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};

use townland_core::{IdSource, IdentityResolver, TownlandKey};
use townland_spatial::{PROJECTED, Reprojector, SpatialError, polygonal_parts, repair};
use townland_storage::{StorageError, TownlandStore};

use crate::config::GeometryLoadConfig;
use crate::error::IngestError;
use crate::report::{GeometryLoadSummary, RejectReason};

/// What happened to one feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutcome {
    Loaded {
        key: TownlandKey,
        /// Whether the geometry needed repair
        repaired: bool,
    },
    Rejected {
        locator: String,
        reason: RejectReason,
        detail: String,
    },
}

impl FeatureOutcome {
    fn rejected(locator: &str, reason: RejectReason, detail: impl Into<String>) -> Self {
        FeatureOutcome::Rejected {
            locator: locator.to_string(),
            reason,
            detail: detail.into(),
        }
    }
}

/// Every `*.geojson` file in a folder, then every `*.json` file, each group
/// sorted by name
pub async fn collection_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|e| IngestError::io(folder, e))?;

    let mut geojson = Vec::new();
    let mut json = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IngestError::io(folder, e))?
    {
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("geojson") => geojson.push(path),
            Some("json") => json.push(path),
            _ => {}
        }
    }
    geojson.sort();
    json.sort();
    geojson.extend(json);
    Ok(geojson)
}

/// The feature's source identifier: `id`, falling back to the `@id` property
pub fn feature_id(feature: &Feature) -> Option<String> {
    match &feature.id {
        Some(feature::Id::String(s)) => Some(s.clone()),
        Some(feature::Id::Number(n)) => Some(n.to_string()),
        None => feature
            .properties
            .as_ref()
            .and_then(|p| p.get("@id"))
            .and_then(scalar_text),
    }
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() { None } else { Some(s.to_string()) }
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Loads polygon collections into the store
pub struct GeometryPipeline<S> {
    store: Arc<S>,
    config: GeometryLoadConfig,
    resolver: IdentityResolver,
    to_projected: Reprojector,
}

impl<S: TownlandStore> GeometryPipeline<S> {
    /// Create a pipeline for collections in `config.source_crs`
    pub fn new(store: Arc<S>, config: GeometryLoadConfig) -> Result<Self, IngestError> {
        let to_projected = Reprojector::new(config.source_crs, PROJECTED)?;
        Ok(Self {
            store,
            resolver: IdentityResolver::with_convention(config.id_convention),
            config,
            to_projected,
        })
    }

    /// Load every collection file in a folder
    #[instrument(skip(self), fields(folder = %folder.display(), source_crs = %self.config.source_crs))]
    pub async fn ingest_folder(&self, folder: &Path) -> Result<GeometryLoadSummary, IngestError> {
        let files = collection_files(folder).await?;
        let mut summary = GeometryLoadSummary::default();

        for path in files {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| IngestError::io(&path, e))?;
            let source_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            info!(file = %source_name, "Loading geometry collection");
            self.ingest_collection(&source_name, &text, &mut summary).await?;
        }

        self.store.checkpoint().await?;
        info!(
            files = summary.files,
            features = summary.report.read,
            loaded = summary.report.loaded,
            skipped = summary.report.skipped(),
            repaired = summary.repaired,
            "Geometry load complete"
        );
        Ok(summary)
    }

    /// Load one GeoJSON document, adding to `summary`
    ///
    /// A document that does not parse aborts the run; bad features inside a
    /// good document are only rejected.
    pub async fn ingest_collection(
        &self,
        source_name: &str,
        text: &str,
        summary: &mut GeometryLoadSummary,
    ) -> Result<(), IngestError> {
        let document: GeoJson = text.parse().map_err(|e: geojson::Error| IngestError::GeoJson {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        let features = match document {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                return Err(IngestError::GeoJson {
                    source_name: source_name.to_string(),
                    message: "expected a FeatureCollection, found a bare geometry".to_string(),
                });
            }
        };
        summary.files += 1;

        for (index, feature) in features.into_iter().enumerate() {
            summary.report.read += 1;
            match self.ingest_feature(source_name, index, feature).await? {
                FeatureOutcome::Loaded { repaired, .. } => {
                    summary.report.loaded += 1;
                    if repaired {
                        summary.repaired += 1;
                    }
                    if summary.report.loaded % self.config.batch_size == 0 {
                        self.store.checkpoint().await?;
                        info!(
                            loaded = summary.report.loaded,
                            features = summary.report.read,
                            "Loaded geometry features"
                        );
                    }
                }
                FeatureOutcome::Rejected {
                    locator,
                    reason,
                    detail,
                } => summary.report.reject(locator, reason, detail),
            }
        }
        Ok(())
    }

    /// Resolve, transform, repair, and store a single feature
    ///
    /// `index` is the feature's position in its collection, used to locate
    /// features that carry no identifier.
    pub async fn ingest_feature(
        &self,
        source_name: &str,
        index: usize,
        feature: Feature,
    ) -> Result<FeatureOutcome, IngestError> {
        let Some(raw_id) = feature_id(&feature) else {
            let locator = format!("{source_name}#{index}");
            debug!(feature = %locator, "Feature has no identifier");
            return Ok(FeatureOutcome::rejected(
                &locator,
                RejectReason::Malformed,
                "feature has no id",
            ));
        };
        let locator = format!("{source_name}#{raw_id}");

        let key = match self.resolver.resolve(IdSource::Geometry(&raw_id)) {
            Ok(key) => key,
            Err(e) => {
                return Ok(FeatureOutcome::rejected(&locator, RejectReason::Malformed, e.to_string()));
            }
        };
        if !self.store.contains_townland(key).await? {
            debug!(feature = %locator, key = %key, "No townland for feature");
            return Ok(FeatureOutcome::rejected(
                &locator,
                RejectReason::UnresolvedReference,
                format!("townland {key} is not loaded"),
            ));
        }

        let cross_reference = feature
            .properties
            .as_ref()
            .and_then(|p| p.get(&self.config.cross_reference_property))
            .and_then(scalar_text);
        let source_feature = match serde_json::to_string(&feature) {
            Ok(json) => json,
            Err(e) => {
                return Ok(FeatureOutcome::rejected(&locator, RejectReason::Malformed, e.to_string()));
            }
        };
        let Some(geometry) = feature.geometry else {
            warn!(feature = %locator, "Feature has no geometry");
            return Ok(FeatureOutcome::rejected(
                &locator,
                RejectReason::Malformed,
                "feature has no geometry",
            ));
        };

        let geometry = match geo_types::Geometry::<f64>::try_from(geometry) {
            Ok(geometry) => geometry,
            Err(e) => {
                return Ok(FeatureOutcome::rejected(&locator, RejectReason::Malformed, e.to_string()));
            }
        };
        let prepared = polygonal_parts(geometry)
            .and_then(|source| self.to_projected.multi_polygon(&source))
            .and_then(|projected| repair(&projected));
        let repaired = match prepared {
            Ok(repaired) => repaired,
            Err(e @ SpatialError::NonPolygonal(_)) => {
                return Ok(FeatureOutcome::rejected(&locator, RejectReason::Malformed, e.to_string()));
            }
            Err(e) => {
                warn!(feature = %locator, error = %e, "Rejecting degenerate geometry");
                return Ok(FeatureOutcome::rejected(
                    &locator,
                    RejectReason::DegenerateGeometry,
                    e.to_string(),
                ));
            }
        };

        match self
            .store
            .upsert_geometry(key, repaired.geometry, source_feature, cross_reference)
            .await
        {
            Ok(_) => {}
            Err(StorageError::MissingTownland(key)) => {
                return Ok(FeatureOutcome::rejected(
                    &locator,
                    RejectReason::UnresolvedReference,
                    format!("townland {key} is not loaded"),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        if repaired.repaired {
            debug!(feature = %locator, key = %key, "Stored repaired geometry");
        }
        Ok(FeatureOutcome::Loaded {
            key,
            repaired: repaired.repaired,
        })
    }
}
