//! # Logger
//!
//! Installs the global `tracing` subscriber: a compact console layer and, when a
//! directory is configured, a non-blocking rolling file layer (plain or JSON).
//! Filtering uses `RUST_LOG` when set, otherwise the configured directive.
//!
//! ## Example
//!
//! ```rust
//! use lreg_domain::config::LoggingConfig;
//! use lreg_logger::Logger;
//!
//! let _logger = Logger::from_config("loeysingsregister", &LoggingConfig::default())
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use lreg_domain::config::LoggingConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for the global subscriber.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    console: bool,
    directory: Option<PathBuf>,
    level: LevelFilter,
    directive: Option<String>,
    rotation: Rotation,
    max_files: usize,
    json: bool,
}

impl LoggerBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            console: true,
            directory: None,
            level: LevelFilter::INFO,
            directive: None,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
        }
    }

    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Writes rolling log files into `directory`, named after the logger.
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Default level when neither `RUST_LOG` nor a directive is set.
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// `EnvFilter` directive such as `lreg=debug,surrealdb=warn`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub const fn max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    /// Writes the file layer as JSON lines.
    pub const fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    /// Installs the subscriber.
    ///
    /// Keep the returned [`Logger`] alive until shutdown so buffered file output is
    /// flushed.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`, a bad
    ///   directive or no enabled output.
    /// * [`LoggerError::Appender`] when the log directory cannot be used.
    /// * [`LoggerError::Subscriber`] when a global subscriber is already set.
    pub fn init(self) -> Result<Logger, LoggerError> {
        self.validate()?;
        let filter = self.env_filter()?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if self.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        let guard = match &self.directory {
            Some(directory) => {
                let (file_layer, guard) = self.file_layer(directory)?;
                layers.push(file_layer);
                Some(guard)
            }
            None => None,
        };

        if layers.is_empty() {
            return Err(invalid("Enable console output or set a log directory"));
        }

        tracing_subscriber::registry().with(layers).with(filter).try_init()?;
        Ok(Logger { guard })
    }

    fn validate(&self) -> Result<(), LoggerError> {
        if self.name.trim().is_empty() {
            return Err(invalid("Logger name cannot be empty"));
        }
        if self.max_files == 0 {
            return Err(invalid("max_files must be greater than zero"));
        }
        Ok(())
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return Ok(builder.from_env_lossy());
        }
        match &self.directive {
            Some(directive) => builder.parse(directive).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid filter '{directive}': {e}").into(),
                context: None,
            }),
            None => Ok(builder.parse_lossy("")),
        }
    }

    fn file_layer(&self, directory: &Path) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
        fs::create_dir_all(directory).map_err(|e| LoggerError::Internal {
            message: e.to_string().into(),
            context: Some(format!("Creating {}", directory.display()).into()),
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(&self.name)
            .filename_suffix(LOG_FILE_SUFFIX)
            .max_log_files(self.max_files)
            .build(directory)
            .context(format!("Opening log files in {}", directory.display()))?;

        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = layer().with_writer(writer).with_ansi(false);
        let boxed = if self.json { file_layer.json().boxed() } else { file_layer.boxed() };
        Ok((boxed, guard))
    }
}

/// Handle to the installed subscriber. Dropping it flushes pending file output.
#[must_use = "Dropping this handle stops the background log writer."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    /// Builder preset from the `logging` configuration section.
    ///
    /// A plain level (`info`, `debug`, ...) sets the default level; anything else is used
    /// as a filter directive.
    pub fn from_config(name: impl Into<String>, config: &LoggingConfig) -> LoggerBuilder {
        let mut builder = LoggerBuilder::new(name).json(config.json);
        builder = match config.level.parse::<LevelFilter>() {
            Ok(level) => builder.level(level),
            Err(_) => builder.directive(config.level.clone()),
        };
        if let Some(directory) = &config.directory {
            builder = builder.directory(directory.clone());
        }
        builder
    }

    /// Whether a file writer is attached.
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn invalid(message: &'static str) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}
