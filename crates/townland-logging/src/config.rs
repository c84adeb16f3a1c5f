//! Logging configuration
//!
//! Plain serde structs, so a config can also be read from a file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to log and where
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when RUST_LOG is unset, e.g. `info` or
    /// `townland_ingest=debug,info`
    pub default_level: String,
    pub console: ConsoleConfig,
    /// JSONL file output, off unless set
    pub file: Option<FileConfig>,
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Debug level with coloured console output
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig {
                format: ConsoleFormat::Pretty,
                ansi: true,
                ..ConsoleConfig::default()
            },
            ..Self::default()
        }
    }

    /// Plain console output plus a month of daily JSONL files in `log_dir`
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            file: Some(FileConfig {
                directory: log_dir,
                max_files: Some(30),
                ..FileConfig::default()
            }),
            ..Self::default()
        }
    }

    /// Warnings and errors only
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            ..Self::default()
        }
    }
}

/// Console line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsoleFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line, shaped by [`JsonlConfig`]
    Json,
}

/// Console (stderr) output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: ConsoleFormat,
    /// Colour codes; only meaningful for [`ConsoleFormat::Pretty`]
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Pretty,
            ansi: false,
        }
    }
}

/// JSONL file output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// Leading part of every file name
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Oldest rotated files beyond this count are deleted
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "townlands".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(7),
        }
    }
}

/// When a new log file is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated at startup
    Never,
}

/// Shape of JSON log lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlConfig {
    /// Event fields at the top level instead of under `fields`
    pub flatten_events: bool,
    /// List of enclosing spans on each line
    pub include_spans: bool,
    /// Source file and line of each event
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_location: false,
        }
    }
}
