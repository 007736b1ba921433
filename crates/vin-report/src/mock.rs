//! Mock Capabilities
//!
//! Call-counting decoder and mailer for tests and offline demos. Answers are
//! fixed at construction; an optional delay simulates a slow provider.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use vin_core::{DecodedAttributes, MailSender, OutgoingMail, ReportError, Result, Vin, VinDecoder};

/// Decoder with a fixed attribute list
pub struct MockDecoder {
    answer: std::result::Result<DecodedAttributes, ReportError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockDecoder {
    pub fn with_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            answer: Ok(fields.into_iter().collect()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// `{ make: Honda, model: Civic, year: 2020 }`
    pub fn honda_civic() -> Self {
        Self::with_fields([("make", "Honda"), ("model", "Civic"), ("year", "2020")])
    }

    pub const fn failing(error: ReportError) -> Self {
        Self {
            answer: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VinDecoder for MockDecoder {
    async fn decode(&self, _vin: &Vin) -> Result<DecodedAttributes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mailer that records every message it accepts
#[derive(Default)]
pub struct MockMailer {
    error: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with a delivery error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Send attempts, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailSender for MockMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.error {
            return Err(ReportError::DeliveryError(message.clone()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
