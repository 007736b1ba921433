//! Mock Payment Capabilities
//!
//! Call-counting stand-ins for the processor, for tests and local demos.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::checkout::{HostedCheckout, HostedCheckoutParams, PaymentGateway};
use crate::error::{PaymentError, Result};
use crate::verify::{PaymentStatus, PaymentVerifier, SessionVerification};

/// Gateway that returns a fixed hosted-checkout URL, or a fixed error
#[derive(Default)]
pub struct MockPaymentGateway {
    error: Option<String>,
    calls: AtomicUsize,
    last: Mutex<Option<HostedCheckoutParams>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a processor error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Parameters of the most recent call
    pub fn last_params(&self) -> Option<HostedCheckoutParams> {
        self.last.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout(&self, params: &HostedCheckoutParams) -> Result<HostedCheckout> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut last) = self.last.lock() {
            *last = Some(params.clone());
        }

        if let Some(message) = &self.error {
            return Err(PaymentError::Processor(message.clone()));
        }

        let id = format!("cs_test_mock{n}");
        Ok(HostedCheckout {
            url: format!("https://checkout.stripe.com/c/pay/{id}"),
            id,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Verifier with a fixed answer for every session
pub struct MockPaymentVerifier {
    status: PaymentStatus,
    vin: Option<String>,
    email: Option<String>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl MockPaymentVerifier {
    pub const fn with_status(status: PaymentStatus) -> Self {
        Self {
            status,
            vin: None,
            email: None,
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub const fn paid() -> Self {
        Self::with_status(PaymentStatus::Paid)
    }

    pub const fn unpaid() -> Self {
        Self::with_status(PaymentStatus::Unpaid)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::paid()
        }
    }

    /// Session metadata recorded at checkout
    pub fn with_metadata(mut self, vin: impl Into<String>, email: impl Into<String>) -> Self {
        self.vin = Some(vin.into());
        self.email = Some(email.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentVerifier for MockPaymentVerifier {
    async fn verify_session(&self, session_id: &str) -> Result<SessionVerification> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.error {
            return Err(PaymentError::Processor(message.clone()));
        }

        Ok(SessionVerification {
            session_id: session_id.to_string(),
            status: self.status,
            vin: self.vin.clone(),
            email: self.email.clone(),
        })
    }
}
