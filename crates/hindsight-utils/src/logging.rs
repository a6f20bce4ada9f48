//! # Logging Utilities
//!
//! Logging infrastructure for Hindsight using `tracing`.
//!
//! Logs always go to stderr: stdout carries command results (often JSON) and
//! must stay parseable. An optional file copy can be requested.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hindsight_utils::init_logging;
//!
//! // Keep the guard alive for the life of the program so file output is flushed.
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log filter (e.g. `RUST_LOG=debug`, `RUST_LOG=hindsight_core=trace`)
//! - `HINDSIGHT_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `HINDSIGHT_LOG_FILE`: Optional path of a log file written alongside stderr

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const FORMAT_VAR: &str = "HINDSIGHT_LOG_FORMAT";
/// Environment variable naming an extra log file.
pub const FILE_VAR: &str = "HINDSIGHT_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Keeps the background file writer alive; dropping it flushes pending lines.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// `RUST_LOG` sets the filter (default `warn`), `HINDSIGHT_LOG_FORMAT` the
/// format and `HINDSIGHT_LOG_FILE` an optional file copy.
///
/// ## Errors
///
/// Returns an error if logging is already initialized, the format variable
/// is not `pretty`/`json`, or the log file's directory cannot be created.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var(FORMAT_VAR) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::default(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()));
    let file = env::var(FILE_VAR).ok().map(PathBuf::from);
    init(filter, format, file.as_deref())
}

/// Initialize logging with an explicit level, ignoring `RUST_LOG`
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    let file = env::var(FILE_VAR).ok().map(PathBuf::from);
    init(EnvFilter::new(Level::from(level).to_string()), format, file.as_deref())
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);

    match format {
        LogFormat::Pretty => base.with_ansi(ansi).with_filter(filter).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn init(filter: EnvFilter, format: LogFormat, file: Option<&Path>) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = Vec::with_capacity(2);
    let mut guard = LoggingGuard::default();

    if let Some(path) = file {
        let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(directory)?;
        let name = path
            .file_name()
            .ok_or_else(|| LoggingError::InvalidFile(path.display().to_string()))?;
        let (writer, worker) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, name));
        layers.push(layer(format, writer, false, filter.clone()));
        guard._file = Some(worker);
    }
    layers.push(layer(format, io::stderr, true, filter));

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Log file path has no file name
    #[error("Invalid log file: {0}")]
    InvalidFile(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("debug").unwrap(), LogLevel::Debug);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_second_init_fails()
    {
        let _first = init_logging_with_level(LogLevel::Warn, LogFormat::Json);
        assert!(matches!(
            init_logging_with_level(LogLevel::Warn, LogFormat::Pretty),
            Err(LoggingError::InitializationFailed(_))
        ));
    }
}
