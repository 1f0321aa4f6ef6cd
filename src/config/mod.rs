//! Configuration Management Module
//!
//! Persistent storage of transfer profiles, logging, mail and crypto settings,
//! and resolution of named profiles into runnable ones.

pub mod profiles;
pub mod storage;
pub mod types;

pub use profiles::{build_profile, resolve_profile, ProfileError, ProfilePreset, ProfileSelector};
pub use storage::{config_dir, config_file, parse_config, ConfigStorage, StorageError};
pub use types::{
    AuthMethod, CompletionRule, ConfigFile, CryptoConfig, EndpointConfig, MailConfig, Protocol,
    RetryPolicy, TransferProfileConfig, CONFIG_VERSION,
};
