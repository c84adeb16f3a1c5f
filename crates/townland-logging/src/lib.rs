//! Console and JSONL logging for the townland loaders
//!
//! # Features
//!
//! - **Console Output**: pretty or JSON lines on stderr
//! - **JSONL Files**: structured lines for later inspection of long loads
//! - **File Rotation**: daily/hourly log rotation via tracing-appender
//! - **RUST_LOG**: always overrides the configured default level
//!
//! # Quick Start
//!
//! ```ignore
//! use townland_logging::{LogConfig, TownlandSubscriberBuilder};
//!
//! // Keep the guard alive until exit so file output is flushed
//! let _guard = TownlandSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//!
//! let _span = tracing::info_span!(townland_logging::spans::POPULATE_GEOM).entered();
//! tracing::info!(loaded = 200, "Loaded geometry features");
//! ```

pub mod config;

pub use config::{ConsoleConfig, ConsoleFormat, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Span names for the command entry points
pub mod spans {
    pub const CREATE_SCHEMA: &str = "create_schema";
    pub const POPULATE_NO_GEOM: &str = "populate_no_geom";
    pub const POPULATE_GEOM: &str = "populate_geom";
    pub const LOAD_TOUCH: &str = "load_townland_touch";
    pub const LOOKUP: &str = "lookup";
    pub const NEIGHBOURS: &str = "neighbours";
    pub const STATS: &str = "stats";
}

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Cannot open log file: {0}")]
    File(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and initializing the logging subscriber
///
/// Console output is pretty by default; the optional file output is always
/// JSON lines.
pub struct TownlandSubscriberBuilder {
    config: LogConfig,
}

impl TownlandSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Set the console line format
    pub fn with_console_format(mut self, format: ConsoleFormat) -> Self {
        self.config.console.format = format;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration this builder will install
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output when dropped; keep it alive
    /// for the life of the program.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.default_level)
                .map_err(|e| LoggingError::Filter(e.to_string()))?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(self.console_layer());
        }
        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(self.json_layer(writer));
            guard = Some(file_guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
        Ok(guard)
    }

    fn console_layer(&self) -> BoxedLayer {
        let jsonl = &self.config.jsonl;
        match self.config.console.format {
            ConsoleFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_ansi(self.config.console.ansi)
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed(),
            ConsoleFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_writer(std::io::stderr)
                .boxed(),
        }
    }

    fn json_layer(&self, writer: NonBlocking) -> BoxedLayer {
        let jsonl = &self.config.jsonl;
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(jsonl.include_spans)
            .flatten_event(jsonl.flatten_events)
            .with_file(jsonl.include_location)
            .with_line_number(jsonl.include_location)
            .with_writer(writer)
            .boxed()
    }
}

impl Default for TownlandSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the file writer for a file config
///
/// `Never` truncates a single `<prefix>.log`; the rotating strategies append
/// to dated `<prefix>.<date>.log` files.
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory).map_err(|e| LoggingError::File(e.to_string()))?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(&path)
                .map_err(|e| LoggingError::File(format!("{}: {e}", path.display())))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder
        .build(&config.directory)
        .map_err(|e| LoggingError::File(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for testing (minimal output, ignores repeat calls)
pub fn init_testing() {
    let _ = TownlandSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_creation() {
        let builder = TownlandSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
    }

    #[test]
    fn test_builder_with_level() {
        let builder = TownlandSubscriberBuilder::new().with_level("trace");
        assert_eq!(builder.config().default_level, "trace");
    }

    #[test]
    fn test_builder_json_console() {
        let builder = TownlandSubscriberBuilder::new().with_console_format(ConsoleFormat::Json);
        assert_eq!(builder.config().console.format, ConsoleFormat::Json);
        let builder = builder.with_console(false);
        assert!(!builder.config().console.enabled);
    }

    #[test]
    fn test_never_rotation_creates_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = FileConfig {
            directory: temp_dir.path().join("nested"),
            prefix: "load".to_string(),
            rotation: RotationStrategy::Never,
            max_files: None,
        };
        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(temp_dir.path().join("nested").join("load.log").exists());
    }

    #[test]
    fn test_daily_rotation_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = FileConfig {
            directory: temp_dir.path().join("logs"),
            ..FileConfig::default()
        };
        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(temp_dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_second_install_is_an_error() {
        init_testing();
        let second = TownlandSubscriberBuilder::new()
            .with_config(LogConfig::testing())
            .try_init();
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
