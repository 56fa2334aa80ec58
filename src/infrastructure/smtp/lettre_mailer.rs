//! SMTP delivery of run-outcome notifications.
//!
//! One authenticated STARTTLS session per run against the fixed outbound
//! relay; the transport is built, used for a single message, and dropped.

use crate::config::NotificationConfig;
use crate::domain::errors::{BackupError, Result};
use crate::ports::mailer_port::Mailer;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Fixed outbound relay for the operator mailbox.
const SMTP_RELAY: &str = "smtp.gmail.com";
const SMTP_PORT: u16 = 587;

/// Concrete implementation of `Mailer` over lettre's blocking transport.
pub struct LettreMailer {
    config: NotificationConfig,
}

impl LettreMailer {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }
}

impl Mailer for LettreMailer {
    fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| BackupError::Notification(format!("bad sender address: {}", e)))?;
        let to: Mailbox = self
            .config
            .to
            .parse()
            .map_err(|e| BackupError::Notification(format!("bad recipient address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| BackupError::Notification(e.to_string()))?;

        let mailer = SmtpTransport::starttls_relay(SMTP_RELAY)
            .map_err(|e| BackupError::Notification(e.to_string()))?
            .port(SMTP_PORT)
            .credentials(Credentials::new(
                self.config.from.clone(),
                self.config.password.clone(),
            ))
            .build();

        mailer
            .send(&message)
            .map_err(|e| BackupError::Notification(e.to_string()))?;
        Ok(())
    }
}
