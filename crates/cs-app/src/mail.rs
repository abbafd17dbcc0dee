//! Outbound report delivery.

use async_trait::async_trait;
use cs_core::Report;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;
use crate::config::MailConfig;
use crate::error::MailError;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `report` to `to`.
    async fn send(&self, to: &str, report: &Report) -> Result<(), MailError>;
}

/// Sends reports through an authenticated SMTP relay over implicit TLS.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.username.parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

/// Build the single-part HTML message for a report.
pub fn build_message(from: Mailbox, to: &str, report: &Report) -> Result<Message, MailError> {
    let message = Message::builder()
        .from(from)
        .to(to.parse()?)
        .subject(report.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(report.html.clone())?;
    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, report: &Report) -> Result<(), MailError> {
        let message = build_message(self.from.clone(), to, report)?;
        let response = self.transport.send(message).await?;
        debug!(to, code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }
}
