//! Completion predicates
//!
//! A pull is only considered done once its [`CompletionCheck`] accepts the
//! transferred [`FileManifest`]. Checks are plain shared functions so callers
//! can plug in their own rule next to the built-in marker checks.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::client::FileManifest;
use crate::config::CompletionRule;

type CheckFn = dyn Fn(&FileManifest) -> bool + Send + Sync;

#[derive(Clone)]
pub struct CompletionCheck {
    label: String,
    check: Arc<CheckFn>,
}

impl CompletionCheck {
    pub fn from_fn<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&FileManifest) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    /// Complete once any file name contains `marker` (case-insensitive)
    pub fn marker(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self::from_fn(format!("marker {}", marker), move |manifest| {
            manifest.contains_marker(&marker)
        })
    }

    /// Complete once a file named `<prefix><yyyyMMddHH>` for the current
    /// local hour has arrived.
    pub fn hourly_marker(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::from_fn(format!("hourly marker {}<yyyyMMddHH>", prefix), move |manifest| {
            manifest.contains_marker(&hourly_marker_name(&prefix, Local::now()))
        })
    }

    /// Complete as soon as a pull succeeds
    pub fn any() -> Self {
        Self::from_fn("any", |_| true)
    }

    pub fn is_complete(&self, manifest: &FileManifest) -> bool {
        (self.check)(manifest)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for CompletionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCheck")
            .field("label", &self.label)
            .finish()
    }
}

impl From<&CompletionRule> for CompletionCheck {
    fn from(rule: &CompletionRule) -> Self {
        match rule {
            CompletionRule::Marker { name } => Self::marker(name.clone()),
            CompletionRule::HourlyMarker { prefix } => Self::hourly_marker(prefix.clone()),
            CompletionRule::Any => Self::any(),
        }
    }
}

/// Marker name for the hour containing `now`
pub fn hourly_marker_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}{}", prefix, now.format("%Y%m%d%H"))
}
