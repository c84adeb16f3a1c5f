//! One function per subcommand
//!
//! Each returns the text to print on stdout; logging goes to stderr.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{Instrument, info, info_span};

use townland_core::{AdminKind, GeometryIdConvention};
use townland_ingest::{
    AdjacencyLoadConfig, AdjacencyPipeline, AdminHierarchyLoader, AttributeLoadConfig,
    GeometryLoadConfig, GeometryPipeline, IngestReport, RejectReason,
};
use townland_logging::spans;
use townland_query::{NeighbourSet, PointLookup, QueryEngine};
use townland_spatial::Crs;
use townland_storage::{RedbStorageConfig, RedbTownlandStore, SCHEMA_VERSION, TownlandStore};

use crate::config::{Cli, Command};

/// Rejections listed in text output; the rest are only counted
const MAX_LISTED_REJECTIONS: usize = 20;

/// Run the parsed command line
pub async fn run(cli: Cli) -> Result<String> {
    let store_config = cli.store_config();
    match cli.command {
        Command::CreateSchema => create_schema(store_config)
            .instrument(info_span!(spans::CREATE_SCHEMA))
            .await,
        Command::PopulateNoGeom { csv, batch } => populate_no_geom(store_config, &csv, batch)
            .instrument(info_span!(spans::POPULATE_NO_GEOM))
            .await,
        Command::PopulateGeom {
            folder,
            source_srid,
            attribute_ids,
            cross_reference,
            batch,
        } => {
            let convention = if attribute_ids {
                GeometryIdConvention::AttributeId
            } else {
                GeometryIdConvention::NegatedRelation
            };
            let config = GeometryLoadConfig::default()
                .with_source_crs(Crs::from_epsg(source_srid)?)
                .with_id_convention(convention)
                .with_cross_reference_property(cross_reference)
                .with_batch_size(batch);
            populate_geom(store_config, &folder, config)
                .instrument(info_span!(spans::POPULATE_GEOM))
                .await
        }
        Command::LoadTownlandTouch {
            csv,
            symmetrize,
            batch,
        } => {
            let config = AdjacencyLoadConfig::default()
                .with_symmetrize(symmetrize)
                .with_batch_size(batch);
            load_touch(store_config, &csv, config)
                .instrument(info_span!(spans::LOAD_TOUCH))
                .await
        }
        Command::Lookup { lon, lat, json } => lookup(store_config, lon, lat, json)
            .instrument(info_span!(spans::LOOKUP))
            .await,
        Command::Neighbours { name, county, json } => {
            neighbours(store_config, &name, county.as_deref(), json)
                .instrument(info_span!(spans::NEIGHBOURS))
                .await
        }
        Command::Stats { json } => stats(store_config, json)
            .instrument(info_span!(spans::STATS))
            .await,
    }
}

fn open_store(config: RedbStorageConfig) -> Result<Arc<RedbTownlandStore>> {
    let path = config.db_path.clone();
    let store = RedbTownlandStore::open(config)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn create_schema(config: RedbStorageConfig) -> Result<String> {
    let path = config.db_path.clone();
    let store = open_store(config)?;
    store.checkpoint().await?;
    info!(path = %path.display(), version = SCHEMA_VERSION, "Schema ready");
    Ok(format!(
        "Schema version {} ready at {}",
        SCHEMA_VERSION,
        path.display()
    ))
}

async fn populate_no_geom(config: RedbStorageConfig, csv: &Path, batch: usize) -> Result<String> {
    let store = open_store(config)?;
    let loader = AdminHierarchyLoader::new(
        store,
        AttributeLoadConfig::default().with_batch_size(batch),
    );
    let summary = loader
        .load_path(csv)
        .await
        .with_context(|| format!("loading {}", csv.display()))?;

    let mut out = String::new();
    write_report(&mut out, "Townlands", &summary.report);
    let _ = writeln!(
        out,
        "Distinct counties: {}, baronies: {}, civil parishes: {}, electoral divisions: {}",
        summary.distinct(AdminKind::County),
        summary.distinct(AdminKind::Barony),
        summary.distinct(AdminKind::CivilParish),
        summary.distinct(AdminKind::ElectoralDivision),
    );
    Ok(out)
}

async fn populate_geom(
    config: RedbStorageConfig,
    folder: &Path,
    geometry: GeometryLoadConfig,
) -> Result<String> {
    let store = open_store(config)?;
    let pipeline = GeometryPipeline::new(store, geometry)?;
    let summary = pipeline
        .ingest_folder(folder)
        .await
        .with_context(|| format!("loading {}", folder.display()))?;

    let mut out = String::new();
    let _ = writeln!(out, "Files: {}", summary.files);
    write_report(&mut out, "Features", &summary.report);
    let _ = writeln!(out, "Repaired: {}", summary.repaired);
    Ok(out)
}

async fn load_touch(
    config: RedbStorageConfig,
    csv: &Path,
    adjacency: AdjacencyLoadConfig,
) -> Result<String> {
    let symmetrize = adjacency.symmetrize;
    let store = open_store(config)?;
    let summary = AdjacencyPipeline::new(store, adjacency)
        .load_path(csv)
        .await
        .with_context(|| format!("loading {}", csv.display()))?;

    let mut out = String::new();
    write_report(&mut out, "Touches", &summary.report);
    if symmetrize {
        let _ = writeln!(out, "Mirrored: {}", summary.mirrored);
    }
    Ok(out)
}

async fn lookup(config: RedbStorageConfig, lon: f64, lat: f64, json: bool) -> Result<String> {
    let engine = QueryEngine::open(open_store(config)?).await?;
    let hit = engine.lookup_point(lon, lat).await?;
    if json {
        return Ok(serde_json::to_string_pretty(&hit)?);
    }
    Ok(match hit {
        Some(hit) => format_lookup(&hit),
        None => format!("No townland at {lon}, {lat}"),
    })
}

async fn neighbours(
    config: RedbStorageConfig,
    name: &str,
    county: Option<&str>,
    json: bool,
) -> Result<String> {
    let engine = QueryEngine::open(open_store(config)?).await?;
    let sets = engine.neighbours(name, county).await?;
    if json {
        return Ok(serde_json::to_string_pretty(&sets)?);
    }
    if sets.is_empty() {
        return Ok(format!("No townland matches {name:?}"));
    }
    Ok(sets.iter().map(format_neighbours).collect::<Vec<_>>().join("\n"))
}

async fn stats(config: RedbStorageConfig, json: bool) -> Result<String> {
    let store = open_store(config)?;
    let stats = store.stats().await?;
    if json {
        return Ok(serde_json::to_string_pretty(&stats)?);
    }

    let mut out = String::new();
    for kind in AdminKind::ALL {
        let _ = writeln!(out, "{:<20} {}", kind.as_str(), stats.admin_units(kind));
    }
    let _ = writeln!(out, "{:<20} {}", "townland", stats.townlands);
    let _ = writeln!(out, "{:<20} {}", "townland_geom", stats.geometries);
    let _ = write!(out, "{:<20} {}", "townland_touch", stats.touches);
    Ok(out)
}

fn write_report(out: &mut String, label: &str, report: &IngestReport) {
    let _ = writeln!(
        out,
        "{label}: {} read, {} loaded, {} skipped",
        report.read,
        report.loaded,
        report.skipped()
    );
    for reason in [
        RejectReason::Malformed,
        RejectReason::UnresolvedReference,
        RejectReason::DegenerateGeometry,
    ] {
        let count = report.count(reason);
        if count > 0 {
            let _ = writeln!(out, "  {reason}: {count}");
        }
    }
    for rejection in report.rejections.iter().take(MAX_LISTED_REJECTIONS) {
        let _ = writeln!(
            out,
            "  {} ({}): {}",
            rejection.locator, rejection.reason, rejection.detail
        );
    }
    if report.rejections.len() > MAX_LISTED_REJECTIONS {
        let _ = writeln!(
            out,
            "  ... {} more",
            report.rejections.len() - MAX_LISTED_REJECTIONS
        );
    }
}

fn format_lookup(hit: &PointLookup) -> String {
    let mut out = format!("Townland: {} ({})", hit.townland.name, hit.townland.key);
    let levels = [
        ("County", &hit.county),
        ("Barony", &hit.barony),
        ("Civil parish", &hit.civil_parish),
        ("Electoral division", &hit.electoral_division),
    ];
    for (label, unit) in levels {
        if let Some(unit) = unit {
            let name = unit.name.as_deref().unwrap_or("?");
            let _ = write!(out, "\n{label}: {name} ({})", unit.key);
        }
    }
    out
}

fn format_neighbours(set: &NeighbourSet) -> String {
    let mut out = format!("{} ({})", set.townland.name, set.townland.key);
    if set.neighbours.is_empty() {
        out.push_str("\n  no recorded neighbours");
    }
    for neighbour in &set.neighbours {
        let _ = write!(
            out,
            "\n  {:<3} {} ({}) {:.0} m",
            neighbour.edge.bucket.as_str(),
            neighbour.name.as_deref().unwrap_or("?"),
            neighbour.edge.dst,
            neighbour.edge.shared_length_m
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;
    use townland_ingest::ATTRIBUTE_HEADERS;

    fn attribute_csv() -> String {
        let mut text = ATTRIBUTE_HEADERS.join(",");
        for (id, name) in [("-5", "Ballybeg"), ("-6", "Ballymore")] {
            let mut fields = vec![String::new(); ATTRIBUTE_HEADERS.len()];
            fields[0] = id.to_string();
            fields[1] = name.to_string();
            let co_id = ATTRIBUTE_HEADERS.iter().position(|h| *h == "CO_OSM_ID").unwrap();
            let co_name = ATTRIBUTE_HEADERS.iter().position(|h| *h == "CO_NAME").unwrap();
            fields[co_id] = "1".to_string();
            fields[co_name] = "Wicklow".to_string();
            text.push('\n');
            text.push_str(&fields.join(","));
        }
        text.push('\n');
        text
    }

    const POLYGONS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","id":"relation/5","properties":{"wikidata":"Q5"},"geometry":{"type":"Polygon","coordinates":[[[-6.50,53.00],[-6.49,53.00],[-6.49,53.01],[-6.50,53.01],[-6.50,53.00]]]}},
        {"type":"Feature","id":"relation/6","properties":{},"geometry":{"type":"Polygon","coordinates":[[[-6.49,53.00],[-6.48,53.00],[-6.48,53.01],[-6.49,53.01],[-6.49,53.00]]]}}
    ]}"#;

    const TOUCHES: &str = "t1_osm_id,t2_osm_id,direction,length_m\n-5,-6,90,680\n";

    async fn run_args(db: &Path, args: &[&str]) -> Result<String> {
        let mut argv = vec!["townlands", "--db", db.to_str().unwrap()];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv).unwrap()).await
    }

    #[tokio::test]
    async fn test_load_and_query_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("data").join("townlands.redb");
        let csv = temp_dir.path().join("townlands.csv");
        let touch = temp_dir.path().join("touch.csv");
        let folder = temp_dir.path().join("polygons");
        std::fs::write(&csv, attribute_csv()).unwrap();
        std::fs::write(&touch, TOUCHES).unwrap();
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("wicklow.geojson"), POLYGONS).unwrap();

        let out = run_args(&db, &["create-schema"]).await.unwrap();
        assert!(out.starts_with(&format!("Schema version {SCHEMA_VERSION}")));

        let out = run_args(&db, &["populate-no-geom", "--csv", csv.to_str().unwrap()])
            .await
            .unwrap();
        assert!(out.contains("Townlands: 2 read, 2 loaded, 0 skipped"));
        assert!(out.contains("Distinct counties: 1"));

        let out = run_args(&db, &["populate-geom", "--folder", folder.to_str().unwrap()])
            .await
            .unwrap();
        assert!(out.contains("Files: 1"));
        assert!(out.contains("Features: 2 read, 2 loaded, 0 skipped"));

        let out = run_args(
            &db,
            &["load-townland-touch", "--csv", touch.to_str().unwrap(), "--symmetrize"],
        )
        .await
        .unwrap();
        assert!(out.contains("Touches: 1 read, 1 loaded"));
        assert!(out.contains("Mirrored: 1"));

        let out = run_args(&db, &["lookup", "-6.495", "53.005"]).await.unwrap();
        assert!(out.starts_with("Townland: Ballybeg (-5)"));
        assert!(out.contains("County: Wicklow (1)"));

        let out = run_args(&db, &["lookup", "-15.0", "53.0"]).await.unwrap();
        assert!(out.starts_with("No townland"));

        let out = run_args(&db, &["neighbours", "ballymore", "--county", "wicklow"])
            .await
            .unwrap();
        assert!(out.contains("W   Ballybeg (-5) 680 m"));

        let out = run_args(&db, &["stats", "--json"]).await.unwrap();
        let stats: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(stats["townlands"], 2);
        assert_eq!(stats["geometries"], 2);
        assert_eq!(stats["touches"], 2);
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("townlands.redb");
        let missing = temp_dir.path().join("nope.csv");
        let err = run_args(&db, &["populate-no-geom", "--csv", missing.to_str().unwrap()])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.csv"));
    }

    #[tokio::test]
    async fn test_unknown_srid_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("townlands.redb");
        let result = run_args(
            &db,
            &["populate-geom", "--folder", ".", "--source-srid", "3857"],
        )
        .await;
        assert!(result.is_err());
    }
}
