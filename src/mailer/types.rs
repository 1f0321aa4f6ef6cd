//! Mail message and server options

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A mailbox: `"Display Name" <email>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_name(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: Some(display_name.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailOptions {
    pub from: Option<Address>,
    /// Defaults to the sender
    pub reply_to: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub subject: String,
    pub body: String,
    pub is_body_html: bool,
    /// Local files attached in order
    pub attachments: Vec<PathBuf>,
}

/// Transport security for the SMTP connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecureSocketOptions {
    /// Plain text only
    None,
    /// Implicit TLS on port 465, STARTTLS when offered elsewhere
    #[default]
    Auto,
    /// Implicit TLS from the first byte
    SslOnConnect,
    /// STARTTLS, fail if the server does not offer it
    StartTls,
    /// STARTTLS if the server offers it
    StartTlsWhenAvailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpOptions {
    #[serde(default)]
    pub server: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default)]
    pub security: SecureSocketOptions,

    #[serde(default)]
    pub requires_authentication: bool,

    /// Write `.eml` files here instead of talking SMTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_directory: Option<PathBuf>,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_smtp_port(),
            user: None,
            password: None,
            security: SecureSocketOptions::default(),
            requires_authentication: false,
            pickup_directory: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    25
}

/// Outcome of [`super::Mailer::send`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendResponse {
    pub successful: bool,
    pub message_id: Option<String>,
    pub error_messages: Vec<String>,
}

impl SendResponse {
    pub(crate) fn sent(message_id: String) -> Self {
        Self {
            successful: true,
            message_id: Some(message_id),
            error_messages: Vec::new(),
        }
    }

    pub(crate) fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            successful: false,
            message_id: None,
            error_messages: vec![error.to_string()],
        }
    }
}
