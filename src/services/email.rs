//! Outbound email with optional PDF attachment.
//!
//! Delivery is driven exclusively by the outbox worker; nothing in the
//! request path awaits an SMTP round trip.

use crate::config::SmtpConfig;
use crate::error::AppError;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub attachment: Option<PdfAttachment>,
}

#[derive(Debug, Clone)]
pub struct PdfAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<(), AppError>;
    fn is_enabled(&self) -> bool;
}

pub struct SmtpProvider {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self, AppError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailMessage) -> Result<(), AppError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| AppError::EmailError("SMTP transport not initialized".to_string()))?;

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("Invalid from address: {}", e))
                })?;

        let to_mailbox: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::EmailError(format!("Invalid recipient: {}", e)))?;

        let builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email.subject);

        let message = match &email.attachment {
            Some(pdf) => {
                let body = SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.body_text.clone());
                let attachment = Attachment::new(pdf.filename.clone()).body(
                    pdf.bytes.clone(),
                    ContentType::parse("application/pdf")
                        .map_err(|e| AppError::EmailError(format!("Invalid content type: {}", e)))?,
                );
                builder
                    .multipart(MultiPart::mixed().singlepart(body).singlepart(attachment))?
            }
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.body_text.clone())?,
        };

        transport
            .send(message)
            .await
            .map_err(|e| AppError::EmailError(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// In-memory provider used when SMTP is disabled and in tests.
pub struct MockEmailProvider {
    send_count: AtomicU64,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self {
            send_count: AtomicU64::new(0),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

impl Default for MockEmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &EmailMessage) -> Result<(), AppError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            has_attachment = email.attachment.is_some(),
            "[MOCK] Email would be sent"
        );

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
