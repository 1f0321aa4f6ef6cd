//! SFTP transfer module
//!
//! Retry engine, the transport seam it runs against, and the russh-backed
//! implementation of that seam.

pub mod client;
pub mod completion;
pub mod control;
pub mod engine;
pub mod error;
pub mod host_key;
pub mod mask;
pub mod path_utils;
pub mod plan;
pub mod profile;
pub mod session;

pub use client::{FileManifest, PullRequest, RemoteSession, TransferClient};
pub use completion::{hourly_marker_name, CompletionCheck};
pub use control::TransferControl;
pub use engine::{AttemptStatus, PullOutcome, TransferAttempt, TransferEngine};
pub use error::{EngineError, SftpError};
pub use mask::{FileMask, MaskError};
pub use plan::{PlannedCopy, RemoteEntry, RemoteFile, RemoteListing};
pub use profile::{TransferProfile, EXPLICIT_RETRY};
pub use session::{SshSftpSession, SshTransferClient};
