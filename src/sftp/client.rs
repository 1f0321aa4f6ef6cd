//! Remote transfer capability
//!
//! The retry engine never talks to SSH directly. It opens a [`RemoteSession`]
//! through an injected [`TransferClient`], pulls or removes, and closes the
//! session before the next attempt.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use super::error::SftpError;
use super::mask::FileMask;
use crate::config::EndpointConfig;

/// Ordered list of remote files transferred in one attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileManifest {
    files: Vec<String>,
}

impl FileManifest {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn into_files(self) -> Vec<String> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.files.iter()
    }

    /// Case-insensitive substring search for a marker file name
    pub fn contains_marker(&self, marker: &str) -> bool {
        let marker = marker.to_lowercase();
        self.files
            .iter()
            .any(|f| f.to_lowercase().contains(&marker))
    }
}

impl From<Vec<String>> for FileManifest {
    fn from(files: Vec<String>) -> Self {
        Self::new(files)
    }
}

impl FromIterator<String> for FileManifest {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FileManifest {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// What one pull should fetch
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// Remote directory, absolute or relative to the login directory
    pub remote_directory: String,
    /// Local directory files are written into
    pub local_directory: PathBuf,
    /// Filter applied to each remote file
    pub file_mask: FileMask,
    /// Delete each remote original once it is written locally
    pub remove_originals: bool,
}

/// Opens sessions against a remote endpoint
#[async_trait]
pub trait TransferClient: Send + Sync {
    async fn open(&self, endpoint: &EndpointConfig) -> Result<Box<dyn RemoteSession>, SftpError>;
}

/// One open remote session
#[async_trait]
pub trait RemoteSession: Send {
    /// Copy every matching file from the remote directory to the local one
    async fn pull(&mut self, request: &PullRequest) -> Result<FileManifest, SftpError>;

    /// Delete the files matching `path_and_mask` and return their paths
    async fn remove(&mut self, path_and_mask: &str) -> Result<Vec<String>, SftpError>;

    async fn close(&mut self) -> Result<(), SftpError>;
}
