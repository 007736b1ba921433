//! Error Types
//!
//! One taxonomy for the whole report workflow. Every externally facing
//! operation reduces its failures to a `ReportError`, which the HTTP layer
//! turns into `{ error, code }`.

use thiserror::Error;

/// Result type alias for report workflow operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Report workflow errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Missing or malformed VIN / email, caught before any external call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Decoder unreachable, timed out, or returned unusable data
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Payment processor rejected the request or was unreachable
    #[error("Payment error: {0}")]
    PaymentError(String),

    /// Mail transport failed
    #[error("Delivery error: {0}")]
    DeliveryError(String),

    /// Checkout session is missing, unpaid, or does not match the request
    #[error("Payment not verified: {0}")]
    PaymentNotVerified(String),

    /// A report for this paid session was already sent
    #[error("Report already fulfilled for session")]
    AlreadyFulfilled,

    /// Another request is delivering this paid session right now
    #[error("Fulfillment already in progress for session")]
    FulfillmentInProgress,

    /// Fulfillment ledger could not be read or written
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReportError {
    /// Stable machine-readable code for API responses
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::DecodeFailure(_) => "DECODE_FAILURE",
            Self::PaymentError(_) => "PAYMENT_ERROR",
            Self::DeliveryError(_) => "DELIVERY_ERROR",
            Self::PaymentNotVerified(_) => "PAYMENT_NOT_VERIFIED",
            Self::AlreadyFulfilled => "ALREADY_FULFILLED",
            Self::FulfillmentInProgress => "FULFILLMENT_IN_PROGRESS",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => format!("Invalid request: {msg}"),
            Self::DecodeFailure(msg) => format!("Vehicle lookup failed: {msg}"),
            Self::PaymentError(msg) => format!("Payment processing failed: {msg}"),
            Self::DeliveryError(_) => {
                "Your report could not be emailed. Please retry or contact support.".into()
            }
            Self::PaymentNotVerified(_) => {
                "We could not confirm your payment for this report.".into()
            }
            Self::AlreadyFulfilled => "This report has already been sent to your email.".into(),
            Self::FulfillmentInProgress => {
                "Your report is being sent right now. Please retry shortly.".into()
            }
            Self::Ledger(_) | Self::Config(_) => {
                "Service configuration error. Please contact support.".into()
            }
        }
    }

    /// Whether the client may reasonably retry the same request
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailure(_)
                | Self::PaymentError(_)
                | Self::DeliveryError(_)
                | Self::FulfillmentInProgress
        )
    }
}
