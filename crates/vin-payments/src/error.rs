//! Payment Error Types

use thiserror::Error;
use vin_core::ReportError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Processor rejected the request or could not be reached
    #[error("Stripe error: {0}")]
    Processor(String),

    /// Request failed validation before reaching the processor
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Processor(_) | Self::Storage(_))
    }
}

impl From<PaymentError> for ReportError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Processor(msg) | PaymentError::InvalidRequest(msg) => {
                Self::PaymentError(msg)
            }
            PaymentError::Config(msg) => Self::Config(msg),
            PaymentError::Storage(msg) => Self::Ledger(msg),
        }
    }
}
