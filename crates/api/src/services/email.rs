//! Email delivery of reminder notifications.
//!
//! Supports two providers:
//! - `console`: Logs emails (development)
//! - `sendgrid`: Uses the SendGrid v3 API

use async_trait::async_trait;
use domain::errors::DispatchError;
use domain::services::{NotificationSink, OutgoingNotification};
use persistence::repositories::RecipientRepository;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::EmailConfig;

/// Channel name reported in dispatch errors and logs.
pub const EMAIL_CHANNEL: &str = "email";

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
}

/// Provider-agnostic email sender.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Turn a rendered reminder into an email for one address.
    ///
    /// Relative action URLs are prefixed with `email.base_url`.
    pub fn compose(
        &self,
        notification: &OutgoingNotification,
        to: String,
        to_name: Option<String>,
    ) -> EmailMessage {
        let mut body_text = notification.body.clone();
        if !notification.action_url.is_empty() {
            let url = if notification.action_url.starts_with('/') {
                format!(
                    "{}{}",
                    self.config.base_url.trim_end_matches('/'),
                    notification.action_url
                )
            } else {
                notification.action_url.clone()
            };
            let label = if notification.action_text.is_empty() {
                "Open"
            } else {
                notification.action_text.as_str()
            };
            body_text.push_str(&format!("\n\n{}: {}", label, url));
        }

        EmailMessage {
            to,
            to_name,
            subject: notification.title.clone(),
            body_text,
        }
    }

    /// Send an email message through the configured provider.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, not sending"
            );
            return Err(EmailError::Disabled);
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            body_text = %message.body_text,
            "Email (console provider)"
        );
        Ok(())
    }

    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let body = sendgrid_payload(&self.config, &message);

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            debug!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

fn sendgrid_payload(config: &EmailConfig, message: &EmailMessage) -> serde_json::Value {
    let mut to = serde_json::json!({ "email": message.to });
    if let Some(name) = &message.to_name {
        to["name"] = serde_json::json!(name);
    }

    serde_json::json!({
        "personalizations": [{ "to": [to] }],
        "from": {
            "email": config.sender_email,
            "name": config.sender_name
        },
        "subject": message.subject,
        "content": [{
            "type": "text/plain",
            "value": message.body_text
        }]
    })
}

/// Email address of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub name: Option<String>,
}

/// Looks up where to email a recipient.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn contact(&self, user_id: Uuid) -> Result<Option<Contact>, String>;
}

#[async_trait]
impl ContactDirectory for RecipientRepository {
    async fn contact(&self, user_id: Uuid) -> Result<Option<Contact>, String> {
        let row = self.find_contact(user_id).await.map_err(|e| e.to_string())?;
        Ok(row
            .filter(|r| !r.email.trim().is_empty())
            .map(|r| Contact {
                email: r.email,
                name: r.display_name,
            }))
    }
}

/// Reminder sink that emails the recipient.
pub struct EmailReminderSink {
    email: EmailService,
    contacts: Arc<dyn ContactDirectory>,
}

impl EmailReminderSink {
    pub fn new(email: EmailService, contacts: Arc<dyn ContactDirectory>) -> Self {
        Self { email, contacts }
    }
}

#[async_trait]
impl NotificationSink for EmailReminderSink {
    async fn send(&self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        if !self.email.is_enabled() {
            return Err(DispatchError::ChannelUnavailable {
                channel: EMAIL_CHANNEL,
                reason: EmailError::Disabled.to_string(),
            });
        }

        let contact = self
            .contacts
            .contact(notification.recipient_id)
            .await
            .map_err(|reason| DispatchError::ChannelUnavailable {
                channel: EMAIL_CHANNEL,
                reason,
            })?
            .ok_or(DispatchError::NoAddress(notification.recipient_id))?;

        let message = self.email.compose(notification, contact.email, contact.name);
        self.email.send(message).await.map_err(|e| match e {
            EmailError::SendFailed(_) | EmailError::ProviderError(_) => {
                DispatchError::Failed(e.to_string())
            }
            EmailError::NotConfigured | EmailError::Disabled => DispatchError::ChannelUnavailable {
                channel: EMAIL_CHANNEL,
                reason: e.to_string(),
            },
        })
    }
}
