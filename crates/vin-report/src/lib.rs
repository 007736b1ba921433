//! # vin-report
//!
//! Payment-gated VIN report workflow: free preview, paid checkout, emailed
//! report.
//!
//! ## Flow
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  preview   │──▶│start_checkout│──▶│   (Stripe)   │──▶│   fulfill    │
//! │ make/model │   │ redirect URL │   │ hosted page  │   │ decode+email │
//! │   /year    │   └──────────────┘   └──────────────┘   └──────────────┘
//! └────────────┘
//! ```
//!
//! `fulfill` runs lookup, composition and delivery in order and stops at the
//! first failure. With a [`PaymentVerifier`](vin_payments::PaymentVerifier)
//! and [`FulfillmentLedger`](vin_payments::FulfillmentLedger) attached, a
//! report is released only for a paid session, once.

pub mod composer;
pub mod delivery;
pub mod lookup;
pub mod mock;
pub mod orchestrator;

pub use composer::ReportComposer;
pub use delivery::{Delivered, ReportDelivery};
pub use lookup::{normalize, VehicleLookup};
pub use orchestrator::{
    FulfillRequest, FulfillmentOrchestrator, FulfillmentReceipt, FulfillmentStage,
    PreviewOutcome, StageError, DEFAULT_CALL_TIMEOUT,
};
