//! Configuration file types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LoggerConfig;
use crate::mailer::{Address, SmtpOptions};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: u32,

    #[serde(default)]
    pub logging: LoggerConfig,

    #[serde(default)]
    pub profiles: Vec<TransferProfileConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,

    #[serde(default)]
    pub crypto: CryptoConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            logging: LoggerConfig::default(),
            profiles: Vec::new(),
            mail: None,
            crypto: CryptoConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Find a profile by name (case-insensitive)
    pub fn profile(&self, name: &str) -> Option<&TransferProfileConfig> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// File transfer protocol spoken by the endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Sftp,
}

/// Remote endpoint a profile connects to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub protocol: Protocol,

    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Authentication method
    pub auth: AuthMethod,

    /// Expected host key fingerprint.
    ///
    /// Accepts `SHA256:<base64>`, bare base64 SHA-256, or the legacy
    /// `ssh-rsa 2048 aa:bb:..` MD5 form. When absent the key is accepted
    /// with a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_key_fingerprint: Option<String>,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            protocol: Protocol::Sftp,
            host: host.into(),
            port: default_port(),
            username: username.into(),
            auth,
            host_key_fingerprint: None,
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.host_key_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `host:port` for log lines
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication methods supported
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// Password authentication
    Password { password: String },

    /// SSH key authentication
    Key {
        /// Path to private key file
        key_path: String,
        /// Optional passphrase for encrypted keys
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password {
            password: password.into(),
        }
    }

    pub fn key(key_path: impl Into<String>, passphrase: Option<String>) -> Self {
        Self::Key {
            key_path: key_path.into(),
            passphrase,
        }
    }
}

/// Wait interval and attempt budget for one pull job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Minutes to sleep between attempts
    pub wait_minutes: u64,
    /// Retries after the first attempt
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(wait_minutes: u64, max_attempts: u32) -> Self {
        Self {
            wait_minutes,
            max_attempts,
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_minutes.saturating_mul(60))
    }
}

/// Serializable form of a completion predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionRule {
    /// A file whose name contains `name` (case-insensitive)
    Marker { name: String },
    /// A file named `<prefix><yyyyMMddHH>` for the current hour
    HourlyMarker { prefix: String },
    /// Any successful pull
    Any,
}

/// A transfer profile as stored on disk.
///
/// Everything except the endpoint and local directory may be left out; the
/// preset matching the profile name fills the gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferProfileConfig {
    pub name: String,

    pub endpoint: EndpointConfig,

    pub local_directory: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mask: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_files: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionRule>,

    /// Per-attempt session log; defaults to `<local_directory>/BackupLog.txt`
    /// for the built-in profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_log: Option<PathBuf>,
}

/// SMTP settings plus the default sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from: Address,

    #[serde(flatten)]
    pub smtp: SmtpOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Key file for [`crate::crypto::Crypto`]; defaults to `protection.key`
    /// in the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    30
}
