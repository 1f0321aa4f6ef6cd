//! `ferry` command line
//!
//! ```bash
//! # Create ~/.ferrykit/config.json to fill in
//! ferry init
//!
//! # Pull the personal profile until LifeFile.txt shows up
//! ferry pull personal
//!
//! # Delete processed reports on the public server
//! ferry remove public "/outgoing/*.csv"
//!
//! # Protect a password before pasting it into config.json
//! ferry encrypt 's3cret' --purpose smtp
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{info, warn};

use ferrykit::config::{
    config_dir, resolve_profile, ConfigFile, ConfigStorage, ProfileError, ProfileSelector,
    StorageError,
};
use ferrykit::crypto::{Crypto, CryptoError, ProtectionKey};
use ferrykit::logging::{init_logging, LogLevel, LoggingError};
use ferrykit::mailer::{Address, EmailOptions, Mailer};
use ferrykit::sftp::{EngineError, SshTransferClient, TransferControl, TransferEngine};

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Scheduled SFTP pulls with completion markers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.ferrykit/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter config file, logging to logs/ next to it
    Init,

    /// Pull a profile until complete or out of retries
    Pull {
        /// personal, public, or any configured profile name
        profile: ProfileSelector,
    },

    /// Remove remote files matching a path and mask
    Remove {
        profile: ProfileSelector,

        /// e.g. "/outgoing/*.csv"
        path_and_mask: String,
    },

    /// List configured profiles
    Profiles,

    /// Protect a string with the local key
    Encrypt {
        text: String,

        #[arg(long)]
        purpose: Option<String>,
    },

    /// Unprotect a string produced by `encrypt`
    Decrypt {
        text: String,

        #[arg(long)]
        purpose: Option<String>,
    },

    /// Send a mail with the configured SMTP settings
    Mail {
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        body: String,

        #[arg(long)]
        html: bool,

        #[arg(long)]
        attach: Vec<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("No mail settings in {0:?}")]
    MailNotConfigured(PathBuf),

    #[error("Mail not sent: {0}")]
    MailFailed(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let storage = match &cli.config {
        Some(path) => ConfigStorage::with_path(path),
        None => ConfigStorage::new()?,
    };
    if let Command::Init = cli.command {
        return init(&storage).await;
    }
    let config = storage.load().await?;

    let mut logging = config.logging.clone();
    if let Some(level) = cli.log_level {
        logging.level = level;
    }
    init_logging(&logging)?;

    match cli.command {
        Command::Init => init(&storage).await,
        Command::Pull { profile } => pull(&config, &profile).await,
        Command::Remove {
            profile,
            path_and_mask,
        } => {
            let mut engine = TransferEngine::new(Arc::new(SshTransferClient::new()));
            engine.configure(resolve_profile(&config, &profile)?);
            for file in engine.remove_files(&path_and_mask).await? {
                println!("{}", file);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Profiles => {
            for p in &config.profiles {
                println!(
                    "{}\t{}\t{}",
                    p.name,
                    p.endpoint.address(),
                    p.remote_directory.as_deref().unwrap_or("-")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Encrypt { text, purpose } => {
            println!("{}", crypto(&config, purpose)?.encrypt(&text)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Decrypt { text, purpose } => {
            println!("{}", crypto(&config, purpose)?.decrypt(&text)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Mail {
            to,
            subject,
            body,
            html,
            attach,
        } => {
            let mail = config
                .mail
                .clone()
                .ok_or_else(|| CliError::MailNotConfigured(storage.path().to_path_buf()))?;
            let email = EmailOptions {
                from: Some(mail.from),
                to: to.into_iter().map(Address::new).collect(),
                subject,
                body,
                is_body_html: html,
                attachments: attach,
                ..Default::default()
            };

            let response = Mailer::new(email, mail.smtp).send().await;
            if !response.successful {
                return Err(CliError::MailFailed(response.error_messages.join("; ")));
            }
            if let Some(id) = response.message_id {
                println!("{}", id);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn init(storage: &ConfigStorage) -> Result<ExitCode, CliError> {
    let mut starter = ConfigFile::default();
    starter.logging.log_file = Some(storage.log_dir().join("ferry.log"));
    storage.init(&starter).await?;
    println!("{}", storage.path().display());
    Ok(ExitCode::SUCCESS)
}

async fn pull(config: &ConfigFile, selector: &ProfileSelector) -> Result<ExitCode, CliError> {
    let control = Arc::new(TransferControl::new());
    let mut engine =
        TransferEngine::new(Arc::new(SshTransferClient::new())).with_control(control.clone());
    engine.configure(resolve_profile(config, selector)?);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current attempt");
            control.cancel();
        }
    });

    let outcome = engine.get_files().await?;
    for file in outcome.files() {
        println!("{}", file);
    }

    if outcome.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        info!(
            "Profile {} incomplete after {} attempt(s)",
            selector,
            outcome.attempts().len()
        );
        Ok(ExitCode::from(1))
    }
}

fn crypto(config: &ConfigFile, purpose: Option<String>) -> Result<Crypto, CliError> {
    let key_file = match &config.crypto.key_file {
        Some(path) => path.clone(),
        None => config_dir()?.join("protection.key"),
    };
    let mut crypto = Crypto::new(ProtectionKey::load_or_create(&key_file)?);
    if let Some(purpose) = purpose {
        crypto.change_purpose(purpose);
    }
    Ok(crypto)
}
