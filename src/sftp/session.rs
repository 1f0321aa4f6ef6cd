//! SSH-backed transfer client
//!
//! Every [`SshTransferClient::open`] performs a full SSH handshake, verifies
//! the host key against the configured fingerprint, authenticates and starts
//! the `sftp` subsystem on a fresh channel.

use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{PublicKey, PublicKeyBase64};
use russh::{client, Disconnect};
use russh_sftp::client::SftpSession as RusshSftpSession;
use tracing::{debug, info, warn};

use super::client::{FileManifest, PullRequest, RemoteSession, TransferClient};
use super::error::SftpError;
use super::host_key::{matches_fingerprint, sha256_fingerprint};
use super::plan::{
    parse_removal, plan_pull, select_removals, walk_tree, EntryKind, RemoteEntry, RemoteListing,
};
use crate::config::{AuthMethod, EndpointConfig};

/// [`TransferClient`] that talks SFTP over russh
#[derive(Debug, Clone, Default)]
pub struct SshTransferClient;

impl SshTransferClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransferClient for SshTransferClient {
    async fn open(&self, endpoint: &EndpointConfig) -> Result<Box<dyn RemoteSession>, SftpError> {
        let session = SshSftpSession::connect(endpoint).await?;
        Ok(Box::new(session))
    }
}

/// Host key check for a single connection
struct ClientHandler {
    address: String,
    expected_fingerprint: Option<String>,
}

impl client::Handler for ClientHandler {
    type Error = SftpError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let key_bytes = server_public_key.public_key_bytes();
        let fingerprint = sha256_fingerprint(&key_bytes);

        match &self.expected_fingerprint {
            Some(expected) if matches_fingerprint(expected, &key_bytes) => {
                debug!("Host key verified for {}", self.address);
                Ok(true)
            }
            Some(expected) => {
                warn!(
                    "Host key mismatch for {}! Expected {}, got {}",
                    self.address, expected, fingerprint
                );
                Err(SftpError::HostKeyRejected(format!(
                    "{} presented {}, expected {}",
                    self.address, fingerprint, expected
                )))
            }
            None => {
                warn!(
                    "No host key fingerprint configured for {}, accepting {}",
                    self.address, fingerprint
                );
                Ok(true)
            }
        }
    }
}

/// One SSH connection with an open SFTP subsystem
pub struct SshSftpSession {
    handle: client::Handle<ClientHandler>,
    sftp: RusshSftpSession,
    address: String,
}

impl SshSftpSession {
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self, SftpError> {
        let address = endpoint.address();
        info!("Connecting to SFTP server at {}", address);

        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| SftpError::ConnectionFailed(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SftpError::ConnectionFailed("No address found".to_string()))?;

        let timeout = Duration::from_secs(endpoint.timeout_secs);
        let ssh_config = client::Config {
            inactivity_timeout: Some(timeout),
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = ClientHandler {
            address: address.clone(),
            expected_fingerprint: endpoint.host_key_fingerprint.clone(),
        };

        let mut handle = tokio::time::timeout(
            timeout,
            client::connect(Arc::new(ssh_config), socket_addr, handler),
        )
        .await
        .map_err(|_| SftpError::Timeout(format!("Connection to {} timed out", address)))??;

        debug!("SSH handshake completed with {}", address);

        let authenticated = match &endpoint.auth {
            AuthMethod::Password { password } => handle
                .authenticate_password(&endpoint.username, password)
                .await
                .map_err(|e| SftpError::AuthenticationFailed(e.to_string()))?,
            AuthMethod::Key {
                key_path,
                passphrase,
            } => {
                let key = russh::keys::load_secret_key(key_path, passphrase.as_deref())?;
                let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key), None);
                handle
                    .authenticate_publickey(&endpoint.username, key_with_hash)
                    .await
                    .map_err(|e| SftpError::AuthenticationFailed(e.to_string()))?
            }
        };

        if !authenticated.success() {
            return Err(SftpError::AuthenticationFailed(format!(
                "Authentication rejected by {} for user {}",
                address, endpoint.username
            )));
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SftpError::ChannelError(e.to_string()))?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            SftpError::SubsystemNotAvailable(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SftpError::SubsystemNotAvailable(e.to_string()))?;

        info!("SFTP session opened on {}", address);

        Ok(Self {
            handle,
            sftp,
            address,
        })
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), SftpError> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut source = self.sftp.open(remote).await?;
        let mut target = tokio::fs::File::create(local).await?;
        tokio::io::copy(&mut source, &mut target).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for SshSftpSession {
    async fn pull(&mut self, request: &PullRequest) -> Result<FileManifest, SftpError> {
        let root = self.sftp.canonicalize(&request.remote_directory).await?;
        debug!(
            "Pulling {} into {:?} (mask '{}')",
            root,
            request.local_directory,
            request.file_mask.as_str()
        );

        let listing = walk_tree(self, &root).await?;
        let plan = plan_pull(&listing, request, Local::now().date_naive())?;

        let mut transferred = Vec::with_capacity(plan.len());
        for copy in plan {
            self.download(&copy.remote, &copy.local).await?;
            if copy.remove_original {
                self.sftp.remove_file(&copy.remote).await?;
            }
            transferred.push(copy.remote);
        }

        Ok(FileManifest::new(transferred))
    }

    async fn remove(&mut self, path_and_mask: &str) -> Result<Vec<String>, SftpError> {
        let (dir, mask) = parse_removal(path_and_mask)?;
        let entries = self.list(&dir).await?;

        let removed = select_removals(&dir, &mask, &entries, Local::now().date_naive());
        for path in &removed {
            self.sftp.remove_file(path).await?;
        }
        Ok(removed)
    }

    async fn close(&mut self) -> Result<(), SftpError> {
        debug!("Closing SFTP session on {}", self.address);
        if let Err(e) = self.sftp.close().await {
            debug!("SFTP close on {} failed: {}", self.address, e);
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteListing for SshSftpSession {
    async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        Ok(self
            .sftp
            .read_dir(dir)
            .await?
            .map(|entry| {
                let metadata = entry.metadata();
                let kind = if metadata.is_dir() {
                    EntryKind::Directory
                } else if metadata.is_regular() {
                    EntryKind::File
                } else {
                    EntryKind::Other
                };
                RemoteEntry {
                    name: entry.file_name(),
                    kind,
                    modified: to_local_time(metadata.mtime),
                }
            })
            .collect())
    }
}

fn to_local_time(mtime: Option<u32>) -> Option<NaiveDateTime> {
    mtime
        .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
        .map(|utc| utc.with_timezone(&Local).naive_local())
}
