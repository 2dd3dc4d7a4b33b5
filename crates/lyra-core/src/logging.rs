//! Tracing subscriber setup for embedders.
//!
//! Library code only emits `tracing` events. An application embedding the
//! player calls [`init`] once at start to get human-readable console output
//! plus JSON log files rotated by `tracing-appender`, and keeps the returned
//! [`LoggingGuard`] alive until exit.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Error, Result};

const LOG_FILE_PREFIX: &str = "lyra";
const CRATE_TARGET: &str = "lyra_core";

/// How often a new log file is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Every hour.
    Hourly,
    /// Every day.
    Daily,
    /// A single file.
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files.
    pub log_directory: PathBuf,
    /// Console verbosity for this crate; `RUST_LOG` overrides it.
    pub console_level: Level,
    /// File verbosity for this crate.
    pub file_level: Level,
    /// File rotation.
    pub rotation: LogRotation,
    /// Rotated files to keep; 0 keeps all.
    pub max_log_files: usize,
    /// Colored console output.
    pub console_ansi: bool,
    /// Source file and line in console output.
    pub include_file_line: bool,
    /// Span open/close events.
    pub log_span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// Verbose settings for local work.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_directory: default_log_directory(),
            console_level: Level::DEBUG,
            file_level: Level::TRACE,
            rotation: LogRotation::Hourly,
            max_log_files: 24,
            console_ansi: true,
            include_file_line: true,
            log_span_events: true,
        }
    }

    /// Quiet console, a week of daily files.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log_directory: default_log_directory(),
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            rotation: LogRotation::Daily,
            max_log_files: 7,
            console_ansi: true,
            include_file_line: false,
            log_span_events: false,
        }
    }

    /// Development settings in debug builds, production otherwise.
    #[must_use]
    pub fn auto() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }

    /// Set the log directory.
    #[must_use]
    pub fn with_log_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_directory = path.into();
        self
    }

    /// Set the console level.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// Set the rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    fn console_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        crate_filter(self.console_level)
    }

    fn file_filter(&self) -> Result<EnvFilter> {
        crate_filter(self.file_level)
    }
}

/// Keeps the file writer alive. Dropping it flushes pending entries.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the log directory or file appender
/// cannot be set up, or if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    std::fs::create_dir_all(&config.log_directory).map_err(|e| {
        Error::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.log_directory.display()
        ))
    })?;

    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log");
    if config.max_log_files > 0 {
        builder = builder.max_log_files(config.max_log_files);
    }
    let appender = builder
        .build(&config.log_directory)
        .map_err(|e| Error::Configuration(format!("Failed to open log file: {e}")))?;
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let span_events = if config.log_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let console_layer = fmt::layer()
        .with_ansi(config.console_ansi)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events.clone())
        .with_filter(config.console_filter()?);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_span_events(span_events)
        .json()
        .with_filter(config.file_filter()?);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Configuration(format!("Logging already initialized: {e}")))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// [`init`] with [`LoggingConfig::auto`].
///
/// # Errors
///
/// See [`init`].
pub fn init_auto() -> Result<LoggingGuard> {
    init(&LoggingConfig::auto())
}

/// Default log directory under the platform data dir.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lyra-player")
        .join("logs")
}

fn crate_filter(level: Level) -> Result<EnvFilter> {
    let directives = format!(
        "warn,{CRATE_TARGET}={}",
        level.as_str().to_ascii_lowercase()
    );
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Configuration(format!("Invalid log filter '{directives}': {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LoggingConfig::default();
        assert_eq!(config.console_level, Level::INFO);
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(config.max_log_files, 7);
        assert!(!config.log_span_events);
    }

    #[test]
    fn test_development_is_verbose() {
        let config = LoggingConfig::development();
        assert_eq!(config.file_level, Level::TRACE);
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert!(config.include_file_line);
    }

    #[test]
    fn test_builder_methods() {
        let config = LoggingConfig::production()
            .with_log_directory("/tmp/lyra-logs")
            .with_console_level(Level::WARN)
            .with_rotation(LogRotation::Never);
        assert_eq!(config.log_directory, PathBuf::from("/tmp/lyra-logs"));
        assert_eq!(config.console_level, Level::WARN);
        assert_eq!(config.rotation, LogRotation::Never);
    }

    #[test]
    fn test_crate_filter_mentions_crate() {
        let filter = crate_filter(Level::DEBUG).unwrap();
        assert!(filter.to_string().contains("lyra_core=debug"));
    }

    #[test]
    fn test_default_log_directory() {
        let dir = default_log_directory();
        assert!(dir.ends_with("lyra-player/logs"));
    }
}
