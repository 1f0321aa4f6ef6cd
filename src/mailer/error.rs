//! Mail error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("No sender address")]
    MissingSender,

    #[error("Invalid address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to read attachment {path:?}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Pickup directory error: {0}")]
    Pickup(#[from] lettre::transport::file::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
