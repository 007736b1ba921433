//! # vin-core
//!
//! Domain model, error taxonomy and capability traits for the pay-per-report
//! VIN service.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  FulfillmentOrchestrator                      │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │ VinDecoder  │  │  PaymentGateway  │  │   MailSender     │  │
//! │  │ (Strategy)  │  │    (Strategy)    │  │   (Strategy)     │  │
//! │  └─────────────┘  └──────────────────┘  └──────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The decoder and mail traits live here; the payment traits live in
//! `vin-payments`. Concrete HTTP implementations are in `vin-runtime`.

pub mod capability;
pub mod config;
pub mod error;
pub mod model;

pub use capability::{DecodedAttributes, MailSender, OutgoingMail, VinDecoder};
pub use config::{AppConfig, MailConfig, RedirectConfig};
pub use error::{ReportError, Result};
pub use model::{
    Currency, EmailAddress, FieldValue, PriceConfig, Report, ReportBody, VehiclePreview,
    VehicleRecord, Vin, UNKNOWN_MARKER,
};
