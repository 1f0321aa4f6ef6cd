//! Config file on disk
//!
//! One JSON document, `~/.ferrykit/config.json` unless `--config` says
//! otherwise (`%APPDATA%\ferrykit` on Windows). A file that no longer parses
//! is moved aside as `config.json.corrupt-<timestamp>` and defaults are used,
//! so a bad edit never blocks the next scheduled pull.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use super::types::{ConfigFile, CONFIG_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("Profile '{0}' is defined more than once")]
    DuplicateProfile(String),

    #[error("Config already exists at {0:?}")]
    AlreadyExists(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `~/.ferrykit`, or `%APPDATA%\ferrykit` on Windows
pub fn config_dir() -> Result<PathBuf, StorageError> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("ferrykit"));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".ferrykit"))
        .ok_or(StorageError::NoConfigDir)
}

pub fn config_file() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("config.json"))
}

/// Parse and validate a config document
pub fn parse_config(contents: &str) -> Result<ConfigFile, StorageError> {
    let config: ConfigFile = serde_json::from_str(contents)?;

    if config.version > CONFIG_VERSION {
        return Err(StorageError::VersionTooNew {
            found: config.version,
            supported: CONFIG_VERSION,
        });
    }

    // Lookups by name ignore case, so names must be unique ignoring case too
    let mut seen = HashSet::new();
    for profile in &config.profiles {
        if !seen.insert(profile.name.to_lowercase()) {
            return Err(StorageError::DuplicateProfile(profile.name.clone()));
        }
    }

    Ok(config)
}

pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Storage at the default location
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            path: config_file()?,
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `logs/` next to the config file
    pub fn log_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(|dir| dir.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Read the config, falling back to defaults when there is none.
    ///
    /// A document that is not valid JSON is quarantined first. Semantic
    /// problems such as a newer version or duplicate profiles are returned
    /// as errors and leave the file untouched.
    pub async fn load(&self) -> Result<ConfigFile, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigFile::default())
            }
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        match parse_config(&contents) {
            Err(StorageError::Json(e)) => {
                warn!("Config file {:?} is not valid: {}", self.path, e);
                match self.quarantine().await {
                    Ok(moved) => warn!("Moved it to {:?}, using defaults", moved),
                    Err(e) => error!("Could not move the invalid config aside: {}", e),
                }
                Ok(ConfigFile::default())
            }
            other => other,
        }
    }

    /// Write the config through a temp file and rename
    pub async fn save(&self, config: &ConfigFile) -> Result<(), StorageError> {
        self.ensure_parent().await?;

        let json = serde_json::to_string_pretty(config)?;
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(io_error(&temp_path))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(io_error(&temp_path))?;
        file.sync_all().await.map_err(io_error(&temp_path))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(io_error(&self.path))
    }

    /// Write a first config, refusing to replace an existing one
    pub async fn init(&self, config: &ConfigFile) -> Result<(), StorageError> {
        self.ensure_parent().await?;

        let json = serde_json::to_string_pretty(config)?;
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(self.path.clone()))
            }
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        file.write_all(json.as_bytes())
            .await
            .map_err(io_error(&self.path))?;
        file.sync_all().await.map_err(io_error(&self.path))
    }

    async fn ensure_parent(&self) -> Result<(), StorageError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).await.map_err(io_error(parent))
            }
            _ => Ok(()),
        }
    }

    async fn quarantine(&self) -> Result<PathBuf, StorageError> {
        let target = self.path.with_extension(format!(
            "json.corrupt-{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        fs::rename(&self.path, &target)
            .await
            .map_err(io_error(&self.path))?;
        Ok(target)
    }
}
