//! Logging setup
//!
//! Console and/or file output through a single tracing-subscriber registry.
//! `RUST_LOG` overrides the configured level.

mod session_log;

pub use session_log::SessionLog;

use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path:?}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Minimum level that gets written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Information,
    Warning,
    Error,
    /// tracing has no level above error, so this filters like `Error`
    Critical,
}

impl LogLevel {
    /// Directive understood by [`EnvFilter`]
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Information => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" | "information" => Ok(LogLevel::Information),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Where log lines go and how verbose they are
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Append log lines to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Also write to stderr
    #[serde(default = "default_console")]
    pub output_to_console: bool,

    #[serde(default)]
    pub level: LogLevel,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            output_to_console: true,
            level: LogLevel::default(),
        }
    }
}

fn default_console() -> bool {
    true
}

/// Install the global subscriber
pub fn init_logging(config: &LoggerConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let console_layer = config
        .output_to_console
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                // The open below reports the real failure
                let _ = std::fs::create_dir_all(parent);
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::OpenFile {
                    path: path.clone(),
                    source,
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("Information".parse::<LogLevel>().unwrap(), LogLevel::Information);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("CRITICAL".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_ordering_and_directives() {
        assert!(LogLevel::Debug < LogLevel::Information);
        assert!(LogLevel::Warning < LogLevel::Critical);
        assert_eq!(LogLevel::Critical.as_directive(), "error");
        assert_eq!(LogLevel::Information.to_string(), "info");
    }

    #[test]
    fn test_logger_config_defaults() {
        let config: LoggerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.output_to_console);
        assert_eq!(config.level, LogLevel::Information);
        assert!(config.log_file.is_none());
    }
}
