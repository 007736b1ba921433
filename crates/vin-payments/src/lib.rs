//! # vin-payments
//!
//! Hosted checkout, payment verification and the fulfillment ledger for the
//! VIN report service.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌──────────────────────────┐
//! │  /create-   │────▶│  Stripe Hosted  │────▶│  success.html?vin=&email= │
//! │  checkout   │     │  Checkout Page  │     │  &session_id=cs_...       │
//! └─────────────┘     └─────────────────┘     └──────────────────────────┘
//!                                                         │
//!                                                         ▼
//!                        verify_session(cs_...) ◀── /send-report
//!                        ledger.claim(key)
//! ```
//!
//! The redirect is the only link between checkout and fulfillment; nothing is
//! stored at checkout time. Before a report is released the session is looked
//! up at the processor and claimed in the ledger, so one payment yields one
//! report.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vin_payments::{PaymentSessionFactory, StripeClient};
//!
//! let stripe = Arc::new(StripeClient::new("sk_test_xxx")?);
//! let factory = PaymentSessionFactory::new(stripe, vec![Currency::Usd]);
//! let session = factory.create_session(request).await?;
//!
//! // Redirect user to: session.redirect_url
//! ```

mod checkout;
mod error;
mod ledger;
pub mod mock;
mod stripe_client;
mod verify;

pub use checkout::{
    success_url_with_params, CheckoutRequest, CheckoutSession, HostedCheckout,
    HostedCheckoutParams, PaymentGateway, PaymentSessionFactory, METADATA_EMAIL, METADATA_VIN,
    SESSION_ID_PLACEHOLDER,
};
pub use error::{PaymentError, Result};
pub use ledger::{Claim, EntryState, FileLedger, FulfillmentLedger, LedgerEntry, LedgerKey, MemoryLedger};
pub use stripe_client::StripeClient;
pub use verify::{PaymentStatus, PaymentVerifier, SessionVerification};
