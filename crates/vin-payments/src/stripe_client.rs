//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach: one-off payment mode,
//! a single line item priced inline, and session retrieval for verification.

use async_trait::async_trait;
use std::collections::HashMap;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionId, CheckoutSessionMode,
    CheckoutSessionPaymentStatus, Client, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentMethodTypes, Currency as StripeCurrency,
};

use vin_core::Currency;

use crate::checkout::{HostedCheckout, HostedCheckoutParams, PaymentGateway, METADATA_EMAIL, METADATA_VIN};
use crate::error::{PaymentError, Result};
use crate::verify::{PaymentStatus, PaymentVerifier, SessionVerification};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Result<Self> {
        if secret_key.trim().is_empty() {
            return Err(PaymentError::Config("Stripe secret key is empty".into()));
        }
        Ok(Self {
            client: Client::new(secret_key),
        })
    }

    const fn currency(currency: Currency) -> StripeCurrency {
        match currency {
            Currency::Usd => StripeCurrency::USD,
            Currency::Cad => StripeCurrency::CAD,
            Currency::Eur => StripeCurrency::EUR,
            Currency::Gbp => StripeCurrency::GBP,
        }
    }

    const fn payment_status(status: CheckoutSessionPaymentStatus) -> PaymentStatus {
        match status {
            CheckoutSessionPaymentStatus::Paid => PaymentStatus::Paid,
            CheckoutSessionPaymentStatus::Unpaid => PaymentStatus::Unpaid,
            CheckoutSessionPaymentStatus::NoPaymentRequired => PaymentStatus::NoPaymentRequired,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout(&self, request: &HostedCheckoutParams) -> Result<HostedCheckout> {
        let mut params = CreateCheckoutSession::new();
        params.customer_email = Some(&request.customer_email);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);

        let metadata: HashMap<String, String> = request
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.metadata = Some(metadata);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Self::currency(request.currency),
                unit_amount: Some(request.amount),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.product_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Processor(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Processor("No checkout URL returned".into()))?;

        Ok(HostedCheckout {
            id: session.id.to_string(),
            url,
        })
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

#[async_trait]
impl PaymentVerifier for StripeClient {
    async fn verify_session(&self, session_id: &str) -> Result<SessionVerification> {
        let id: CheckoutSessionId = session_id.parse().map_err(|_| {
            PaymentError::InvalidRequest(format!("'{session_id}' is not a checkout session id"))
        })?;

        let session = StripeCheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| PaymentError::Processor(e.to_string()))?;

        let metadata_value =
            |key: &str| session.metadata.as_ref().and_then(|m| m.get(key)).cloned();

        let verification = SessionVerification {
            session_id: session.id.to_string(),
            status: Self::payment_status(session.payment_status),
            vin: metadata_value(METADATA_VIN),
            email: metadata_value(METADATA_EMAIL).or_else(|| session.customer_email.clone()),
        };

        tracing::debug!(
            session_id = %verification.session_id,
            status = ?verification.status,
            "Retrieved checkout session"
        );

        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(StripeClient::new("  "), Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StripeClient::payment_status(CheckoutSessionPaymentStatus::Paid),
            PaymentStatus::Paid
        );
        assert_eq!(
            StripeClient::payment_status(CheckoutSessionPaymentStatus::Unpaid),
            PaymentStatus::Unpaid
        );
    }

    #[tokio::test]
    async fn test_malformed_session_id_rejected_locally() {
        let client = StripeClient::new("sk_test_123").unwrap();
        let err = client.verify_session("not-a-session").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }
}
