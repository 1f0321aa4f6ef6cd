//! Outgoing mail
//!
//! Builds a MIME message from [`EmailOptions`] and hands it to SMTP or to a
//! pickup directory. Delivery problems are reported in the [`SendResponse`]
//! rather than as errors.

mod error;
mod types;

pub use error::MailerError;
pub use types::{Address, EmailOptions, SecureSocketOptions, SendResponse, SmtpOptions};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info, warn};

/// Port where `Auto` security switches to implicit TLS
const SMTPS_PORT: u16 = 465;

pub struct Mailer {
    email: EmailOptions,
    smtp: SmtpOptions,
}

impl Mailer {
    pub fn new(email: EmailOptions, smtp: SmtpOptions) -> Self {
        Self { email, smtp }
    }

    /// Attachments are read through tokio, so this never blocks the runtime
    pub async fn build_message(&self) -> Result<Message, MailerError> {
        let from = self.email.from.as_ref().ok_or(MailerError::MissingSender)?;
        let from = mailbox(from)?;
        let reply_to = match &self.email.reply_to {
            Some(addr) => mailbox(addr)?,
            None => from.clone(),
        };

        let mut builder = Message::builder()
            .from(from)
            .reply_to(reply_to)
            .subject(self.email.subject.as_str())
            .message_id(Some(format!("<{}@ferrykit>", uuid::Uuid::new_v4())));

        for addr in &self.email.to {
            builder = builder.to(mailbox(addr)?);
        }
        for addr in &self.email.cc {
            builder = builder.cc(mailbox(addr)?);
        }
        for addr in &self.email.bcc {
            builder = builder.bcc(mailbox(addr)?);
        }

        let body_type = if self.email.is_body_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        if self.email.attachments.is_empty() {
            return Ok(builder.header(body_type).body(self.email.body.clone())?);
        }

        let mut parts = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(body_type)
                .body(self.email.body.clone()),
        );
        for path in &self.email.attachments {
            let content = tokio::fs::read(path)
                .await
                .map_err(|source| MailerError::Attachment {
                    path: path.clone(),
                    source,
                })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let content_type = ContentType::parse(mime.essence_str())?;
            parts = parts.singlepart(Attachment::new(name).body(content, content_type));
        }

        Ok(builder.multipart(parts)?)
    }

    /// Build and deliver the message
    pub async fn send(&self) -> SendResponse {
        let message = match self.build_message().await {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed to build mail message: {}", e);
                return SendResponse::failed(e);
            }
        };

        let result = match &self.smtp.pickup_directory {
            Some(dir) => self.drop_in_pickup(dir, message).await,
            None => self.send_smtp(message).await,
        };

        match result {
            Ok(id) => {
                info!("Mail '{}' sent ({})", self.email.subject, id);
                SendResponse::sent(id)
            }
            Err(e) => {
                warn!("Failed to send mail '{}': {}", self.email.subject, e);
                SendResponse::failed(e)
            }
        }
    }

    async fn drop_in_pickup(
        &self,
        dir: &std::path::Path,
        message: Message,
    ) -> Result<String, MailerError> {
        debug!("Writing mail to pickup directory {:?}", dir);
        tokio::fs::create_dir_all(dir).await?;
        let transport = AsyncFileTransport::<Tokio1Executor>::new(dir);
        Ok(transport.send(message).await?)
    }

    async fn send_smtp(&self, message: Message) -> Result<String, MailerError> {
        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(str::to_string)
            .unwrap_or_default();

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.smtp.server)
            .port(self.smtp.port)
            .tls(self.tls()?);

        if self.smtp.requires_authentication {
            let user = self.smtp.user.clone().unwrap_or_default();
            let password = self.smtp.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(user, password));
        }

        debug!(
            "Sending mail via {}:{} ({:?})",
            self.smtp.server, self.smtp.port, self.smtp.security
        );
        let response = builder.build().send(message).await?;
        debug!("SMTP response: {:?}", response.code());
        Ok(message_id)
    }

    fn tls(&self) -> Result<Tls, MailerError> {
        let params = || TlsParameters::new(self.smtp.server.clone());
        Ok(match self.smtp.security {
            SecureSocketOptions::None => Tls::None,
            SecureSocketOptions::Auto if self.smtp.port == SMTPS_PORT => Tls::Wrapper(params()?),
            SecureSocketOptions::Auto | SecureSocketOptions::StartTlsWhenAvailable => {
                Tls::Opportunistic(params()?)
            }
            SecureSocketOptions::SslOnConnect => Tls::Wrapper(params()?),
            SecureSocketOptions::StartTls => Tls::Required(params()?),
        })
    }
}

fn mailbox(addr: &Address) -> Result<Mailbox, MailerError> {
    let email = addr
        .email
        .trim()
        .parse::<lettre::Address>()
        .map_err(|source| MailerError::InvalidAddress {
            address: addr.email.clone(),
            source,
        })?;
    Ok(Mailbox::new(addr.display_name.clone(), email))
}
