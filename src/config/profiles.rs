//! Named transfer profiles
//!
//! `personal` and `public` carry built-in retry and completion presets; any
//! other name is a custom profile that defaults to the explicit-parameter
//! behaviour. The presets are tuning data for their jobs, nothing more. A
//! value set in the config file always wins over the preset.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::types::{CompletionRule, ConfigFile, RetryPolicy, TransferProfileConfig};
use crate::sftp::path_utils::windows_to_linux_path;
use crate::sftp::{CompletionCheck, FileMask, MaskError, TransferProfile, EXPLICIT_RETRY};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("No profile named '{0}' in the configuration")]
    NotFound(String),

    #[error("Profile '{profile}' has an invalid file mask: {source}")]
    InvalidMask {
        profile: String,
        #[source]
        source: MaskError,
    },
}

/// Which profile to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSelector {
    Personal,
    Public,
    Custom(String),
}

impl ProfileSelector {
    pub fn name(&self) -> &str {
        match self {
            ProfileSelector::Personal => "personal",
            ProfileSelector::Public => "public",
            ProfileSelector::Custom(name) => name,
        }
    }

    pub fn preset(&self) -> ProfilePreset {
        match self {
            ProfileSelector::Personal => ProfilePreset {
                retry: RetryPolicy::new(5, 5),
                completion: CompletionRule::Marker {
                    name: "LifeFile.txt".to_string(),
                },
                remote_directory: Some("delivery_files"),
                file_mask: ">today|*/Reports/*; */Events/*",
                session_log_name: Some("BackupLog.txt"),
            },
            ProfileSelector::Public => ProfilePreset {
                retry: RetryPolicy::new(2, 30),
                completion: CompletionRule::HourlyMarker {
                    prefix: "PublicAlarmFile_".to_string(),
                },
                remote_directory: None,
                file_mask: "",
                session_log_name: Some("BackupLog.txt"),
            },
            ProfileSelector::Custom(_) => ProfilePreset {
                retry: EXPLICIT_RETRY,
                completion: CompletionRule::Any,
                remote_directory: None,
                file_mask: "",
                session_log_name: None,
            },
        }
    }
}

impl FromStr for ProfileSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "personal" => ProfileSelector::Personal,
            "public" => ProfileSelector::Public,
            _ => ProfileSelector::Custom(s.to_string()),
        })
    }
}

impl fmt::Display for ProfileSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Defaults a selector contributes when the config file leaves a field out
#[derive(Debug, Clone)]
pub struct ProfilePreset {
    pub retry: RetryPolicy,
    pub completion: CompletionRule,
    pub remote_directory: Option<&'static str>,
    pub file_mask: &'static str,
    pub session_log_name: Option<&'static str>,
}

/// Resolve a selector against the config file into a runnable profile
pub fn resolve_profile(
    config: &ConfigFile,
    selector: &ProfileSelector,
) -> Result<TransferProfile, ProfileError> {
    let stored = config
        .profile(selector.name())
        .ok_or_else(|| ProfileError::NotFound(selector.name().to_string()))?;
    build_profile(stored, &selector.preset())
}

/// Merge a stored profile with a preset
pub fn build_profile(
    stored: &TransferProfileConfig,
    preset: &ProfilePreset,
) -> Result<TransferProfile, ProfileError> {
    let mask_source = stored.file_mask.as_deref().unwrap_or(preset.file_mask);
    let file_mask = FileMask::parse(mask_source).map_err(|source| ProfileError::InvalidMask {
        profile: stored.name.clone(),
        source,
    })?;

    let remote_directory = stored
        .remote_directory
        .as_deref()
        .or(preset.remote_directory)
        .map(windows_to_linux_path)
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| ".".to_string());

    let completion = stored.completion.as_ref().unwrap_or(&preset.completion);

    let session_log = stored.session_log.clone().or_else(|| {
        preset
            .session_log_name
            .map(|name| stored.local_directory.join(name))
    });

    Ok(TransferProfile {
        name: stored.name.clone(),
        endpoint: stored.endpoint.clone(),
        remote_directory,
        local_directory: stored.local_directory.clone(),
        file_mask,
        remove_files: stored.remove_files.unwrap_or(false),
        retry: stored.retry.unwrap_or(preset.retry),
        completion: CompletionCheck::from(completion),
        session_log,
    })
}
