//! Report Delivery
//!
//! Sends a composed report through the mail capability.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use vin_core::{EmailAddress, MailSender, OutgoingMail, Report, ReportError, Result};

/// Proof that the mail provider accepted a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Delivered {
    /// Local id for correlating logs
    pub delivery_id: Uuid,

    /// Provider that accepted the message
    pub provider: String,
}

/// Mail-backed report delivery
pub struct ReportDelivery {
    mailer: Arc<dyn MailSender>,
    from: String,
}

impl ReportDelivery {
    pub fn new(mailer: Arc<dyn MailSender>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    /// Send a report
    ///
    /// A malformed recipient fails with `InvalidInput` before the provider is
    /// contacted; provider failures surface as `DeliveryError`.
    pub async fn send(&self, report: &Report) -> Result<Delivered> {
        let recipient = EmailAddress::parse(&report.recipient)?;

        let mail = OutgoingMail {
            from: self.from.clone(),
            to: recipient.to_string(),
            subject: report.body.subject.clone(),
            text: report.body.text.clone(),
            html: report.body.html.clone(),
        };

        self.mailer.send(&mail).await.map_err(|e| match e {
            ReportError::DeliveryError(_) => e,
            other => ReportError::DeliveryError(other.to_string()),
        })?;

        let delivered = Delivered {
            delivery_id: Uuid::new_v4(),
            provider: self.mailer.name().to_string(),
        };

        tracing::info!(
            delivery_id = %delivered.delivery_id,
            provider = %delivered.provider,
            vin = %report.vin,
            to = %recipient.masked(),
            "Report delivered"
        );

        Ok(delivered)
    }
}
