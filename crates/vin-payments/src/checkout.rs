//! Hosted Checkout
//!
//! Builds checkout sessions for a single report purchase. The server keeps no
//! record linking a session to a pending fulfillment: the success redirect
//! carries the VIN and email back to the client, together with the session id
//! placeholder the processor fills in.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use vin_core::{Currency, EmailAddress, Vin};

use crate::error::{PaymentError, Result};

/// Placeholder Stripe replaces with the real session id on redirect.
/// Must reach the processor unencoded.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Metadata keys attached to every session
pub const METADATA_VIN: &str = "vin";
pub const METADATA_EMAIL: &str = "email";

/// Request to start checkout for one report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub vin: Vin,
    pub email: EmailAddress,

    /// Amount in minor currency units
    pub amount: i64,

    pub currency: Currency,

    /// Success page; vin, email and session id are appended as query parameters
    pub success_redirect: String,

    /// Page shown when the customer abandons checkout
    pub cancel_redirect: String,
}

/// Processor-issued checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Processor session id
    pub id: String,

    /// URL to redirect the customer to
    pub redirect_url: String,
}

/// Parameters handed to the processor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedCheckoutParams {
    pub amount: i64,
    pub currency: Currency,
    pub product_name: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// What the processor returned
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedCheckout {
    pub id: String,
    pub url: String,
}

/// Payment processor capability (Strategy pattern)
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout page and return its URL
    async fn create_checkout(&self, params: &HostedCheckoutParams) -> Result<HostedCheckout>;

    /// Processor name, for logs
    fn name(&self) -> &str;
}

/// Validates checkout requests and turns them into processor sessions
pub struct PaymentSessionFactory {
    gateway: Arc<dyn PaymentGateway>,
    supported_currencies: Vec<Currency>,
}

impl PaymentSessionFactory {
    pub fn new(gateway: Arc<dyn PaymentGateway>, supported_currencies: Vec<Currency>) -> Self {
        Self {
            gateway,
            supported_currencies,
        }
    }

    /// Create a checkout session
    ///
    /// Amount and currency are checked before the processor is contacted.
    pub async fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidRequest(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        if !self.supported_currencies.contains(&request.currency) {
            return Err(PaymentError::InvalidRequest(format!(
                "currency '{}' is not accepted",
                request.currency
            )));
        }

        let success_url =
            success_url_with_params(&request.success_redirect, &request.vin, &request.email)?;

        let params = HostedCheckoutParams {
            amount: request.amount,
            currency: request.currency,
            product_name: format!("VIN Report for {}", request.vin),
            customer_email: request.email.to_string(),
            success_url,
            cancel_url: request.cancel_redirect,
            metadata: BTreeMap::from([
                (METADATA_VIN.to_string(), request.vin.to_string()),
                (METADATA_EMAIL.to_string(), request.email.to_string()),
            ]),
        };

        let checkout = self.gateway.create_checkout(&params).await?;

        tracing::info!(
            gateway = self.gateway.name(),
            session_id = %checkout.id,
            vin = %request.vin,
            email = %request.email.masked(),
            "Created checkout session"
        );

        Ok(CheckoutSession {
            id: checkout.id,
            redirect_url: checkout.url,
        })
    }
}

/// Append vin, email and the session placeholder to the success page URL
pub fn success_url_with_params(base: &str, vin: &Vin, email: &EmailAddress) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| PaymentError::Config(format!("invalid success redirect '{base}': {e}")))?;
    url.query_pairs_mut()
        .append_pair("vin", vin.as_str())
        .append_pair("email", email.as_str());

    Ok(format!("{url}&session_id={SESSION_ID_PLACEHOLDER}"))
}
