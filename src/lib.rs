//! ferrykit - scheduled SFTP pulls with completion markers
//!
//! The core is [`sftp::TransferEngine`], a bounded-retry pull that keeps
//! retrying until a profile-specific marker file shows up in the transferred
//! set. Around it sit profile configuration, tracing-based logging, a
//! purpose-scoped string encryptor and a small SMTP mailer.

pub mod config;
pub mod crypto;
pub mod logging;
pub mod mailer;
pub mod sftp;

#[cfg(test)]
pub(crate) mod test_support;
