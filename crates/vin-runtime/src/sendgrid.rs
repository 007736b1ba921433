//! SendGrid Mail Provider
//!
//! Implementation of `MailSender` over the SendGrid v3 `mail/send` HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use vin_core::{
    capability::{MailSender, OutgoingMail},
    config::{MailConfig, DEFAULT_MAIL_API_URL},
    error::{ReportError, Result},
};

/// SendGrid provider configuration
#[derive(Clone, Debug)]
pub struct SendGridConfig {
    /// Send endpoint
    pub api_url: String,

    /// API key (sent as a bearer token)
    pub api_key: String,

    /// Request timeout
    pub timeout: Duration,
}

impl SendGridConfig {
    pub fn from_mail_config(mail: &MailConfig, timeout: Duration) -> Self {
        Self {
            api_url: mail.api_url.clone(),
            api_key: mail.api_key.clone(),
            timeout,
        }
    }
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_MAIL_API_URL.into(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// SendGrid mail sender
pub struct SendGridMailer {
    client: Client,
    config: SendGridConfig,
}

impl SendGridMailer {
    /// Create from configuration
    pub fn from_config(config: SendGridConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ReportError::Config("mail API key is empty".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReportError::Config(format!("mail HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Build the v3 request body
    pub fn payload(mail: &OutgoingMail) -> Value {
        json!({
            "personalizations": [{ "to": [{ "email": mail.to }] }],
            "from": { "email": mail.from },
            "subject": mail.subject,
            "content": [
                { "type": "text/plain", "value": mail.text },
                { "type": "text/html", "value": mail.html },
            ],
        })
    }
}

#[async_trait]
impl MailSender for SendGridMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&Self::payload(mail))
            .send()
            .await
            .map_err(|e| ReportError::DeliveryError(format!("mail provider unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "Mail accepted by provider");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(ReportError::DeliveryError(format!(
            "mail provider responded with HTTP {status}: {}",
            detail.trim()
        )))
    }

    fn name(&self) -> &str {
        "sendgrid"
    }
}
