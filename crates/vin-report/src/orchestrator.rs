//! Fulfillment Orchestrator
//!
//! Coordinates preview → checkout → delivery. Logical states per VIN/email
//! pair are never stored; they follow from which operation is called:
//!
//! ```text
//! PREVIEWED (optional) → CHECKOUT_STARTED → PAID → FULFILLED | FULFILLMENT_FAILED
//! ```
//!
//! `fulfill` is a linear pipeline. Each stage either hands its output to the
//! next or stops the run with a [`StageError`] naming where it stopped:
//!
//! ```text
//! validate → verify payment* → claim ledger* → lookup → compose → deliver
//!                                                 (* when configured)
//! ```
//!
//! Without a verifier the orchestrator trusts that the caller arrived via the
//! processor's success redirect. Without a ledger, repeating `fulfill` sends
//! the report again.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use vin_core::{
    EmailAddress, PriceConfig, RedirectConfig, Report, ReportError, VehiclePreview, Vin,
};
use vin_payments::{
    CheckoutRequest, Claim, FulfillmentLedger, LedgerKey, PaymentError, PaymentSessionFactory,
    PaymentVerifier,
};

use crate::composer::ReportComposer;
use crate::delivery::{Delivered, ReportDelivery};
use crate::lookup::VehicleLookup;

/// Upper bound on any single external call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Pipeline stage, reported with every failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStage {
    Validate,
    Checkout,
    Verify,
    Claim,
    Lookup,
    Deliver,
}

impl FulfillmentStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Checkout => "checkout",
            Self::Verify => "verify",
            Self::Claim => "claim",
            Self::Lookup => "lookup",
            Self::Deliver => "deliver",
        }
    }

    fn timeout_error(self, after: Duration) -> ReportError {
        let message = format!("{} timed out after {}ms", self.as_str(), after.as_millis());
        match self {
            Self::Lookup => ReportError::DecodeFailure(message),
            Self::Deliver => ReportError::DeliveryError(message),
            Self::Validate | Self::Checkout | Self::Verify | Self::Claim => {
                ReportError::PaymentError(message)
            }
        }
    }
}

impl fmt::Display for FulfillmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure tagged with the stage that produced it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} stage failed: {error}")]
pub struct StageError {
    pub stage: FulfillmentStage,
    #[source]
    pub error: ReportError,
}

impl StageError {
    pub const fn new(stage: FulfillmentStage, error: ReportError) -> Self {
        Self { stage, error }
    }
}

impl From<StageError> for ReportError {
    fn from(err: StageError) -> Self {
        err.error
    }
}

fn at(stage: FulfillmentStage) -> impl Fn(ReportError) -> StageError {
    move |error| StageError::new(stage, error)
}

/// Result of the free preview
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewOutcome {
    Found(VehiclePreview),
    /// Decoder failed; shown to the user instead of an error status
    LookupFailed { message: String },
}

/// Client request to release a paid report
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FulfillRequest {
    pub vin: String,
    pub email: String,

    /// Processor session id from the success redirect
    pub session_id: Option<String>,
}

/// Successful fulfillment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FulfillmentReceipt {
    pub vin: Vin,
    pub delivery: Delivered,
    pub session_id: Option<String>,
}

/// Payment-gated report workflow
pub struct FulfillmentOrchestrator {
    lookup: VehicleLookup,
    sessions: PaymentSessionFactory,
    delivery: ReportDelivery,
    price: PriceConfig,
    redirect: RedirectConfig,
    verifier: Option<Arc<dyn PaymentVerifier>>,
    ledger: Option<Arc<dyn FulfillmentLedger>>,
    call_timeout: Duration,
}

impl FulfillmentOrchestrator {
    pub const fn new(
        lookup: VehicleLookup,
        sessions: PaymentSessionFactory,
        delivery: ReportDelivery,
        price: PriceConfig,
        redirect: RedirectConfig,
    ) -> Self {
        Self {
            lookup,
            sessions,
            delivery,
            price,
            redirect,
            verifier: None,
            ledger: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Require a processor-verified paid session before delivery
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn PaymentVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Deliver at most once per paid session
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn FulfillmentLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub const fn verification_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    pub const fn ledger_enabled(&self) -> bool {
        self.ledger.is_some()
    }

    /// Free summary: make, model and year only
    ///
    /// Only a blank VIN is an error. Decoder failures come back as
    /// [`PreviewOutcome::LookupFailed`].
    pub async fn preview(&self, vin: &str) -> vin_core::Result<PreviewOutcome> {
        let vin = Vin::parse(vin)?;

        match self
            .bounded(FulfillmentStage::Lookup, self.lookup.decode_vin(&vin))
            .await
        {
            Ok(record) => {
                tracing::info!(vin = %vin, state = "PREVIEWED", "Preview served");
                Ok(PreviewOutcome::Found(record.preview()))
            }
            Err(failure) => {
                tracing::warn!(vin = %vin, error = %failure.error, "Preview lookup failed");
                Ok(PreviewOutcome::LookupFailed {
                    message: failure.error.user_message(),
                })
            }
        }
    }

    /// Create a checkout session at the configured price
    ///
    /// Returns the processor's redirect URL verbatim. The VIN is not decoded
    /// first, so checkout does not depend on decoder availability.
    pub async fn start_checkout(&self, vin: &str, email: &str) -> vin_core::Result<String> {
        let vin = Vin::parse(vin)?;
        let email = EmailAddress::parse(email)?;

        let request = CheckoutRequest {
            vin: vin.clone(),
            email,
            amount: self.price.amount_minor,
            currency: self.price.currency,
            success_redirect: self.redirect.success_url(),
            cancel_redirect: self.redirect.cancel_url(),
        };

        let session = self
            .bounded(FulfillmentStage::Checkout, async move {
                self.sessions
                    .create_session(request)
                    .await
                    .map_err(ReportError::from)
            })
            .await?;

        tracing::info!(
            vin = %vin,
            session_id = %session.id,
            state = "CHECKOUT_STARTED",
            "Checkout started"
        );

        Ok(session.redirect_url)
    }

    /// Release the paid report
    ///
    /// Stops at the first failing stage; later stages are not attempted.
    pub async fn fulfill(
        &self,
        request: &FulfillRequest,
    ) -> Result<FulfillmentReceipt, StageError> {
        let vin = Vin::parse(&request.vin).map_err(at(FulfillmentStage::Validate))?;
        let email = EmailAddress::parse(&request.email).map_err(at(FulfillmentStage::Validate))?;
        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        self.verify_payment(&vin, &email, session_id).await?;
        let claim = self.claim(&vin, &email, session_id)?;

        let outcome = self.produce_and_deliver(&vin, &email).await;

        if let Some(claim) = claim {
            if outcome.is_ok() {
                claim.complete();
            } else {
                claim.release();
            }
        }

        match outcome {
            Ok(delivery) => {
                tracing::info!(
                    vin = %vin,
                    to = %email.masked(),
                    session_id = session_id.unwrap_or("-"),
                    delivery_id = %delivery.delivery_id,
                    state = "FULFILLED",
                    "Report fulfilled"
                );
                Ok(FulfillmentReceipt {
                    vin,
                    delivery,
                    session_id: session_id.map(str::to_string),
                })
            }
            Err(failure) => {
                tracing::warn!(
                    vin = %vin,
                    to = %email.masked(),
                    stage = %failure.stage,
                    error = %failure.error,
                    state = "FULFILLMENT_FAILED",
                    "Report not delivered"
                );
                Err(failure)
            }
        }
    }

    async fn verify_payment(
        &self,
        vin: &Vin,
        email: &EmailAddress,
        session_id: Option<&str>,
    ) -> Result<(), StageError> {
        let Some(verifier) = &self.verifier else {
            return Ok(());
        };
        let stage = FulfillmentStage::Verify;

        let session_id = session_id.ok_or_else(|| {
            StageError::new(
                stage,
                ReportError::PaymentNotVerified("missing checkout session id".into()),
            )
        })?;

        let verification = self
            .bounded(stage, async {
                verifier
                    .verify_session(session_id)
                    .await
                    .map_err(|e| match e {
                        PaymentError::InvalidRequest(msg) => ReportError::PaymentNotVerified(msg),
                        other => other.into(),
                    })
            })
            .await?;

        if !verification.is_paid() {
            return Err(StageError::new(
                stage,
                ReportError::PaymentNotVerified(format!(
                    "session {session_id} is {:?}",
                    verification.status
                )),
            ));
        }
        verification
            .check_matches(vin, email)
            .map_err(|msg| StageError::new(stage, ReportError::PaymentNotVerified(msg)))?;

        tracing::info!(vin = %vin, session_id, state = "PAID", "Payment verified");
        Ok(())
    }

    fn claim(
        &self,
        vin: &Vin,
        email: &EmailAddress,
        session_id: Option<&str>,
    ) -> Result<Option<ClaimGuard>, StageError> {
        let Some(ledger) = &self.ledger else {
            return Ok(None);
        };
        let stage = FulfillmentStage::Claim;

        let session_id = session_id.ok_or_else(|| {
            StageError::new(
                stage,
                ReportError::InvalidInput("checkout session id is required".into()),
            )
        })?;

        let key = LedgerKey::new(session_id, vin, email);
        match ledger.claim(&key).map_err(|e| StageError::new(stage, e.into()))? {
            Claim::Acquired => Ok(Some(ClaimGuard {
                ledger: Arc::clone(ledger),
                key,
                settled: false,
            })),
            Claim::InFlight => {
                tracing::info!(vin = %vin, session_id, "Fulfillment already in progress");
                Err(StageError::new(stage, ReportError::FulfillmentInProgress))
            }
            Claim::AlreadyFulfilled => {
                tracing::info!(vin = %vin, session_id, "Duplicate fulfillment refused");
                Err(StageError::new(stage, ReportError::AlreadyFulfilled))
            }
        }
    }

    async fn produce_and_deliver(
        &self,
        vin: &Vin,
        email: &EmailAddress,
    ) -> Result<Delivered, StageError> {
        let record = self
            .bounded(FulfillmentStage::Lookup, self.lookup.decode_vin(vin))
            .await?;

        let report = Report {
            vin: vin.clone(),
            recipient: email.to_string(),
            body: ReportComposer::compose(&record),
        };

        self.bounded(FulfillmentStage::Deliver, self.delivery.send(&report))
            .await
    }

    /// Run one external call under the per-call timeout
    async fn bounded<T, F>(&self, stage: FulfillmentStage, call: F) -> Result<T, StageError>
    where
        F: Future<Output = vin_core::Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(at(stage)),
            Err(_) => Err(StageError::new(stage, stage.timeout_error(self.call_timeout))),
        }
    }
}

/// An acquired ledger claim
///
/// Completed or released explicitly once delivery is decided. If the owning
/// future is dropped first (client gone, task aborted) the claim is released
/// so the customer can retry. Ledger trouble here is logged, not surfaced.
struct ClaimGuard {
    ledger: Arc<dyn FulfillmentLedger>,
    key: LedgerKey,
    settled: bool,
}

impl ClaimGuard {
    fn complete(mut self) {
        self.settled = true;
        if let Err(e) = self.ledger.complete(&self.key) {
            tracing::error!(key = %self.key, error = %e, "Failed to record fulfilled session");
        }
    }

    fn release(mut self) {
        self.settled = true;
        self.release_now();
    }

    fn release_now(&self) {
        if let Err(e) = self.ledger.release(&self.key) {
            tracing::error!(key = %self.key, error = %e, "Failed to release fulfillment claim");
        }
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(key = %self.key, "Fulfillment abandoned mid-flight, releasing claim");
            self.release_now();
        }
    }
}
