use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// One outbound message, built per triggering stock item. Ephemeral; never
/// persisted.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    /// No recipients configured. An explicit configuration state, not a
    /// failure.
    Skipped,
    Failed,
}

/// Outcome of a single delivery attempt. Transport failures are captured
/// here rather than propagated so one bad send never aborts a batch.
#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub status: SendStatus,
    pub reason: Option<String>,
}

impl SendResult {
    pub fn sent() -> Self {
        Self {
            status: SendStatus::Sent,
            reason: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: SendStatus::Skipped,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Failed,
            reason: Some(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == SendStatus::Failed
    }
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("invalid SMTP relay {relay}: {source}")]
    InvalidRelay {
        relay: String,
        #[source]
        source: lettre::transport::smtp::Error,
    },
    #[error("invalid sender address {address}: {source}")]
    InvalidSender {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Attempt delivery exactly once. Implementations report failures via
    /// the returned [`SendResult`]; they do not error.
    async fn send(&self, request: &NotificationRequest) -> SendResult;
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    /// Upper bound on one delivery attempt so a hung relay cannot stall the
    /// scheduler.
    pub send_timeout: Duration,
}

/// Delivers notifications through an SMTP relay (STARTTLS).
#[derive(Debug)]
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    send_timeout: Duration,
}

impl SmtpNotificationSender {
    pub fn new(config: SmtpConfig) -> Result<Self, NotifierError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|source| NotifierError::InvalidRelay {
                relay: config.host.clone(),
                source,
            })?
            .credentials(Credentials::new(config.username, config.password))
            .port(config.port)
            .build();

        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|source| NotifierError::InvalidSender {
                address: config.from_address.clone(),
                source,
            })?;

        Ok(Self {
            transport,
            from,
            send_timeout: config.send_timeout,
        })
    }

    async fn deliver(&self, request: &NotificationRequest) -> Result<(), String> {
        for recipient in &request.recipients {
            let to = recipient
                .parse::<Mailbox>()
                .map_err(|err| format!("invalid recipient {recipient}: {err}"))?;
            let message = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(&request.subject)
                .header(ContentType::TEXT_PLAIN)
                .body(request.body.clone())
                .map_err(|err| format!("failed to build message: {err}"))?;

            tokio::time::timeout(self.send_timeout, self.transport.send(message))
                .await
                .map_err(|_| {
                    format!(
                        "send to {recipient} timed out after {:?}",
                        self.send_timeout
                    )
                })?
                .map_err(|err| format!("smtp send to {recipient} failed: {err}"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send(&self, request: &NotificationRequest) -> SendResult {
        if request.recipients.is_empty() {
            debug!(subject = %request.subject, "no recipients configured; skipping send");
            return SendResult::skipped();
        }

        match self.deliver(request).await {
            Ok(()) => SendResult::sent(),
            Err(reason) => {
                warn!(subject = %request.subject, %reason, "notification send failed");
                SendResult::failed(reason)
            }
        }
    }
}

/// Logs notifications instead of delivering them. Used when no SMTP
/// transport is configured.
#[derive(Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationSender for LoggingNotifier {
    async fn send(&self, request: &NotificationRequest) -> SendResult {
        if request.recipients.is_empty() {
            return SendResult::skipped();
        }
        tracing::info!(
            subject = %request.subject,
            recipients = request.recipients.len(),
            "NOTIFY {}",
            request.body
        );
        SendResult::sent()
    }
}
