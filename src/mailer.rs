// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SMTP dispatch of composed messages.
//!
//! The transport is configured once at startup with fixed server,
//! credential, and encryption settings; per-request work is limited to
//! building and sending the already-composed message. Failures are
//! reported, never retried, so caller-facing latency stays bounded.

use crate::composer::ComposedMessage;
use crate::config::{SmtpConfig, SmtpEncryption};
use crate::error::ConfigError;
use async_trait::async_trait;
use lettre::address::Address;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Opaque transport failure, surfaced to the pipeline as a terminal
/// dispatch error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Outbound message transport.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError>;
}

/// SMTP transport over a pooled async connection.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport from fixed settings. The envelope-from mailbox is
    /// the operator address, which keeps DMARC alignment with the sending
    /// domain; the submitter only ever appears in Reply-To.
    pub fn new(config: &SmtpConfig, from_address: &str, from_name: &str) -> Result<Self, ConfigError> {
        let builder = match config.encryption {
            SmtpEncryption::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            }
            SmtpEncryption::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            SmtpEncryption::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.host,
            )),
        }
        .map_err(|e| ConfigError::Invalid {
            name: "SMTP_HOST",
            value: format!("{}: {e}", config.host),
        })?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(15)))
            .build();

        let from = mailbox(from_name, from_address).map_err(|e| ConfigError::Invalid {
            name: "OPERATOR_ADDRESS",
            value: format!("{from_address}: {e}"),
        })?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        let to = mailbox(&message.recipient_name, &message.recipient_address)
            .map_err(|e| TransportError(format!("bad recipient address: {e}")))?;
        let reply_to = mailbox(&message.reply_to_name, &message.reply_to_address)
            .map_err(|e| TransportError(format!("bad reply-to address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .reply_to(reply_to)
            .subject(&message.subject_line)
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| TransportError(format!("message build failed: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        debug!(recipient = %message.recipient_address, "message handed to SMTP relay");
        Ok(())
    }
}

/// Mailbox with an optional display name.
fn mailbox(name: &str, address: &str) -> Result<Mailbox, lettre::address::AddressError> {
    let address: Address = address.parse()?;
    let name = (!name.trim().is_empty()).then(|| name.to_string());
    Ok(Mailbox::new(name, address))
}
