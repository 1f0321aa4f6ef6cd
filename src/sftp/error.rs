//! SFTP error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SftpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Host key rejected: {0}")]
    HostKeyRejected(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Key error: {0}")]
    KeyError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("SFTP subsystem not available: {0}")]
    SubsystemNotAvailable(String),

    #[error("SFTP protocol error: {0}")]
    ProtocolError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<russh::Error> for SftpError {
    fn from(err: russh::Error) -> Self {
        SftpError::ProtocolError(err.to_string())
    }
}

impl From<russh::keys::Error> for SftpError {
    fn from(err: russh::keys::Error) -> Self {
        SftpError::KeyError(err.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for SftpError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        let err_str = err.to_string();
        if err_str.contains("No such file") || err_str.contains("not found") {
            SftpError::FileNotFound(err_str)
        } else if err_str.contains("Permission denied") {
            SftpError::PermissionDenied(err_str)
        } else {
            SftpError::ProtocolError(err_str)
        }
    }
}

/// Errors surfaced by [`crate::sftp::TransferEngine`].
///
/// Transport and completeness failures never show up here; they are logged
/// and folded into the retry loop.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Transfer engine used before configure()")]
    NotConfigured,

    #[error("Transfer cancelled")]
    Cancelled,
}
