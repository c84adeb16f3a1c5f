use std::path::PathBuf;

use clap::{Parser, Subcommand};

use townland_logging::{ConsoleFormat, LogConfig};
use townland_storage::RedbStorageConfig;

#[derive(Debug, Parser)]
#[command(
    name = "townlands",
    version,
    about = "Load and query Irish townland boundaries"
)]
pub struct Cli {
    /// Database file
    #[arg(long, global = true, default_value = "./data/townlands.redb")]
    pub db: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log to the console as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also write JSONL logs to daily files in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create every table and record the schema version
    CreateSchema,

    /// Load townlands and their admin hierarchy from the attribute CSV
    PopulateNoGeom {
        /// Attribute CSV file
        #[arg(long)]
        csv: PathBuf,
        /// Records per durable commit
        #[arg(long, default_value_t = 1000)]
        batch: usize,
    },

    /// Load townland polygons from a folder of GeoJSON collections
    PopulateGeom {
        /// Folder holding *.geojson / *.json collections
        #[arg(long)]
        folder: PathBuf,
        /// EPSG code of the input coordinates
        #[arg(long, default_value_t = 4326)]
        source_srid: u32,
        /// Feature ids carry attribute ids rather than polygon relation ids
        #[arg(long)]
        attribute_ids: bool,
        /// Feature property holding the Wikidata id
        #[arg(long, default_value = "wikidata")]
        cross_reference: String,
        /// Features per durable commit
        #[arg(long, default_value_t = 200)]
        batch: usize,
    },

    /// Load the directed touch table
    LoadTownlandTouch {
        /// Touch CSV file
        #[arg(long)]
        csv: PathBuf,
        /// Also add the reverse of each edge when it is missing
        #[arg(long)]
        symmetrize: bool,
        /// Records per durable commit
        #[arg(long, default_value_t = 500)]
        batch: usize,
    },

    /// Find the townland covering a point
    Lookup {
        /// Longitude (WGS84)
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Latitude (WGS84)
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the neighbours of townlands matching a name
    Neighbours {
        /// Name, with % and _ wildcards
        name: String,
        /// Only townlands in this county
        #[arg(long)]
        county: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Row counts per table
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn log_config(&self) -> LogConfig {
        let mut config = match &self.log_dir {
            Some(dir) => LogConfig::production(dir.clone()),
            None => LogConfig::default(),
        };
        config.default_level = self.log_level.clone();
        if self.log_json {
            config.console.format = ConsoleFormat::Json;
        }
        config
    }

    pub fn store_config(&self) -> RedbStorageConfig {
        RedbStorageConfig {
            db_path: self.db.clone(),
            ..Default::default()
        }
    }
}
