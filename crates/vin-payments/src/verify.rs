//! Payment Verification
//!
//! Server-side check that a checkout session was actually paid before a
//! report is released. The success redirect alone proves nothing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vin_core::{EmailAddress, Vin};

use crate::error::Result;

/// Processor-reported payment state of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// Result of looking a session up at the processor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionVerification {
    pub session_id: String,
    pub status: PaymentStatus,

    /// VIN recorded in session metadata at checkout time
    pub vin: Option<String>,

    /// Email recorded at checkout time
    pub email: Option<String>,
}

impl SessionVerification {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// Check the session was bought for this VIN and recipient
    ///
    /// Fields the session did not record are not compared.
    pub fn check_matches(&self, vin: &Vin, email: &EmailAddress) -> std::result::Result<(), String> {
        if let Some(paid_vin) = &self.vin {
            if paid_vin.trim() != vin.as_str() {
                return Err(format!(
                    "session {} was purchased for a different VIN",
                    self.session_id
                ));
            }
        }
        if let Some(paid_email) = &self.email {
            if paid_email.trim().to_lowercase() != email.normalized() {
                return Err(format!(
                    "session {} was purchased by a different customer",
                    self.session_id
                ));
            }
        }
        Ok(())
    }
}

/// Checkout session lookup capability
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify_session(&self, session_id: &str) -> Result<SessionVerification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verification(vin: Option<&str>, email: Option<&str>) -> SessionVerification {
        SessionVerification {
            session_id: "cs_test_1".into(),
            status: PaymentStatus::Paid,
            vin: vin.map(Into::into),
            email: email.map(Into::into),
        }
    }

    #[test]
    fn test_matching_session() {
        let vin = Vin::parse("1HGCM82633A004352").unwrap();
        let email = EmailAddress::parse("Buyer@Example.com").unwrap();
        let v = verification(Some("1HGCM82633A004352"), Some("buyer@example.com"));
        assert!(v.is_paid());
        assert!(v.check_matches(&vin, &email).is_ok());
    }

    #[test]
    fn test_mismatched_vin() {
        let vin = Vin::parse("1HGCM82633A004352").unwrap();
        let email = EmailAddress::parse("buyer@example.com").unwrap();
        let v = verification(Some("JH4KA7561PC008269"), None);
        assert!(v.check_matches(&vin, &email).is_err());
    }

    #[test]
    fn test_unpaid_is_not_paid() {
        let mut v = verification(None, None);
        v.status = PaymentStatus::Unpaid;
        assert!(!v.is_paid());
        v.status = PaymentStatus::NoPaymentRequired;
        assert!(!v.is_paid());
    }
}
