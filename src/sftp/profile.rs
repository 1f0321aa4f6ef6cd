//! Runtime transfer profile handed to the engine

use std::path::PathBuf;

use super::client::PullRequest;
use super::completion::CompletionCheck;
use super::mask::FileMask;
use crate::config::{EndpointConfig, RetryPolicy};

/// Retry policy used when a caller builds a profile by hand
pub const EXPLICIT_RETRY: RetryPolicy = RetryPolicy {
    wait_minutes: 10,
    max_attempts: 1,
};

/// Everything one recurring pull job needs.
///
/// Built once, then given to [`super::TransferEngine::configure`]; the engine
/// never mutates it.
#[derive(Debug, Clone)]
pub struct TransferProfile {
    pub name: String,
    pub endpoint: EndpointConfig,
    pub remote_directory: String,
    pub local_directory: PathBuf,
    pub file_mask: FileMask,
    /// Delete remote originals during the pull
    pub remove_files: bool,
    pub retry: RetryPolicy,
    pub completion: CompletionCheck,
    pub session_log: Option<PathBuf>,
}

impl TransferProfile {
    /// Profile from explicit parameters: 10 minute wait, one retry, and
    /// complete as soon as a pull succeeds.
    pub fn explicit(
        endpoint: EndpointConfig,
        remote_directory: impl Into<String>,
        local_directory: impl Into<PathBuf>,
        file_mask: FileMask,
        remove_files: bool,
    ) -> Self {
        Self {
            name: "custom".to_string(),
            endpoint,
            remote_directory: remote_directory.into(),
            local_directory: local_directory.into(),
            file_mask,
            remove_files,
            retry: EXPLICIT_RETRY,
            completion: CompletionCheck::any(),
            session_log: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_completion(mut self, completion: CompletionCheck) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_session_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_log = Some(path.into());
        self
    }

    pub(crate) fn pull_request(&self) -> PullRequest {
        PullRequest {
            remote_directory: self.remote_directory.clone(),
            local_directory: self.local_directory.clone(),
            file_mask: self.file_mask.clone(),
            remove_originals: self.remove_files,
        }
    }
}
