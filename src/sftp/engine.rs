//! File transfer retry engine
//!
//! Pulls a profile's remote directory until its completion check accepts the
//! transferred files or the attempt budget runs out. One session is opened per
//! attempt and closed before the next one. Transport failures and incomplete
//! pulls are logged and retried; they never surface as errors. Callers learn
//! about total failure from [`PullOutcome::is_complete`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::client::{FileManifest, PullRequest, TransferClient};
use super::control::TransferControl;
use super::error::{EngineError, SftpError};
use super::profile::TransferProfile;
use crate::logging::SessionLog;

/// How one attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Pull succeeded and the completion check accepted it
    Complete,
    /// Pull succeeded but the completion check rejected it
    Incomplete,
    /// Session or transfer failed
    Failed(String),
}

/// One iteration of the retry loop
#[derive(Debug, Clone, Serialize)]
pub struct TransferAttempt {
    /// Zero-based attempt number
    pub ordinal: u64,
    pub status: AttemptStatus,
    pub files: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl TransferAttempt {
    fn summary(&self, profile: &TransferProfile) -> String {
        let total = u64::from(profile.retry.max_attempts) + 1;
        let head = format!(
            "[{}] attempt {}/{} on {}",
            profile.name,
            self.ordinal + 1,
            total,
            profile.endpoint.address()
        );
        match &self.status {
            AttemptStatus::Complete => format!("{}: complete, {} file(s)", head, self.files.len()),
            AttemptStatus::Incomplete => {
                format!("{}: incomplete, {} file(s)", head, self.files.len())
            }
            AttemptStatus::Failed(e) => format!("{}: failed: {}", head, e),
        }
    }
}

/// Result of [`TransferEngine::get_files`]
#[derive(Debug, Clone, Serialize)]
pub struct PullOutcome {
    manifest: FileManifest,
    attempts: Vec<TransferAttempt>,
    complete: bool,
}

impl PullOutcome {
    /// Files from the last pull that returned (empty if none did)
    pub fn files(&self) -> &[String] {
        self.manifest.files()
    }

    pub fn manifest(&self) -> &FileManifest {
        &self.manifest
    }

    pub fn into_files(self) -> Vec<String> {
        self.manifest.into_files()
    }

    pub fn attempts(&self) -> &[TransferAttempt] {
        &self.attempts
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

pub struct TransferEngine {
    client: Arc<dyn TransferClient>,
    profile: Option<TransferProfile>,
    control: Option<Arc<TransferControl>>,
}

impl TransferEngine {
    pub fn new(client: Arc<dyn TransferClient>) -> Self {
        Self {
            client,
            profile: None,
            control: None,
        }
    }

    /// Allow the pull to be cancelled between attempts
    pub fn with_control(mut self, control: Arc<TransferControl>) -> Self {
        self.control = Some(control);
        self
    }

    /// Bind the profile used by [`get_files`](Self::get_files) and
    /// [`remove_files`](Self::remove_files). No I/O happens here.
    pub fn configure(&mut self, profile: TransferProfile) {
        debug!(
            "Configured profile '{}' for {} (retry every {} minutes, up to {} retries, completion: {})",
            profile.name,
            profile.endpoint.address(),
            profile.retry.wait_minutes,
            profile.retry.max_attempts,
            profile.completion.label()
        );
        self.profile = Some(profile);
    }

    pub fn profile(&self) -> Option<&TransferProfile> {
        self.profile.as_ref()
    }

    /// Pull until complete or out of attempts.
    ///
    /// Performs at most `max_attempts + 1` attempts and sleeps the wait
    /// interval after every incomplete attempt except the last.
    pub async fn get_files(&self) -> Result<PullOutcome, EngineError> {
        let profile = self.profile.as_ref().ok_or(EngineError::NotConfigured)?;
        let request = profile.pull_request();
        let session_log = profile.session_log.as_ref().map(SessionLog::new);
        let max_attempts = u64::from(profile.retry.max_attempts);
        let wait_minutes = profile.retry.wait_minutes;

        let mut attempt: u64 = 0;
        let mut complete = false;
        let mut last = FileManifest::default();
        let mut history = Vec::new();

        while !complete && attempt <= max_attempts {
            self.check_cancelled()?;

            let started_at = Utc::now();
            let record = match self.pull_once(profile, &request).await {
                Ok(manifest) => {
                    for file in &manifest {
                        info!("{} transferred.", file);
                    }
                    complete = profile.completion.is_complete(&manifest);
                    let record = TransferAttempt {
                        ordinal: attempt,
                        status: if complete {
                            AttemptStatus::Complete
                        } else {
                            AttemptStatus::Incomplete
                        },
                        files: manifest.files().to_vec(),
                        started_at,
                    };
                    last = manifest;
                    record
                }
                Err(e) => {
                    error!(
                        "Error transferring files. Will try again in {} minutes: {}",
                        wait_minutes, e
                    );
                    TransferAttempt {
                        ordinal: attempt,
                        status: AttemptStatus::Failed(e.to_string()),
                        files: Vec::new(),
                        started_at,
                    }
                }
            };

            if let Some(log) = &session_log {
                log.append(&record.summary(profile));
            }
            history.push(record);

            if complete {
                info!("File transfer complete.");
            } else if attempt == max_attempts {
                warn!(
                    "Not all the files transferred in {} attempts. Out of retry attempts.",
                    attempt + 1
                );
                attempt += 1;
            } else {
                warn!(
                    "Not all the files transferred. Trying again in {} minutes.",
                    wait_minutes
                );
                self.backoff(profile.retry.wait()).await?;
                attempt += 1;
            }
        }

        Ok(PullOutcome {
            manifest: last,
            attempts: history,
            complete,
        })
    }

    /// Remove remote files matching `path_and_mask` in a single session.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn remove_files(&self, path_and_mask: &str) -> Result<Vec<String>, EngineError> {
        let profile = self.profile.as_ref().ok_or(EngineError::NotConfigured)?;

        match self.remove_once(profile, path_and_mask).await {
            Ok(files) => {
                info!("Files removed. The following files were removed:");
                for file in &files {
                    info!("{}", file);
                }
                Ok(files)
            }
            Err(e) => {
                error!("Error removing files: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn pull_once(
        &self,
        profile: &TransferProfile,
        request: &PullRequest,
    ) -> Result<FileManifest, SftpError> {
        let mut session = self.client.open(&profile.endpoint).await?;

        info!("Retrieving files from {}...", profile.endpoint.address());
        let result = session.pull(request).await;
        if let Err(e) = session.close().await {
            debug!("Error closing session to {}: {}", profile.endpoint.address(), e);
        }

        let manifest = result?;
        info!("Files retrieved. Verifying they all transferred...");
        Ok(manifest)
    }

    async fn remove_once(
        &self,
        profile: &TransferProfile,
        path_and_mask: &str,
    ) -> Result<Vec<String>, SftpError> {
        let mut session = self.client.open(&profile.endpoint).await?;

        info!("Removing files...");
        let result = session.remove(path_and_mask).await;
        if let Err(e) = session.close().await {
            debug!("Error closing session to {}: {}", profile.endpoint.address(), e);
        }
        result
    }

    fn check_cancelled(&self) -> Result<(), EngineError> {
        match &self.control {
            Some(ctrl) if ctrl.is_cancelled() => {
                info!("Transfer cancelled");
                Err(EngineError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    async fn backoff(&self, delay: Duration) -> Result<(), EngineError> {
        let Some(ctrl) = &self.control else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };

        let mut cancel_rx = ctrl.subscribe_cancellation();
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = cancel_rx.changed() => {
                    if changed.is_err() {
                        // Sender gone, nobody can cancel any more
                        (&mut sleep).await;
                        return Ok(());
                    }
                    if *cancel_rx.borrow() {
                        info!("Transfer cancelled during backoff");
                        return Err(EngineError::Cancelled);
                    }
                }
            }
        }
    }
}
