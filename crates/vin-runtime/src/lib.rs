//! # vin-runtime
//!
//! Concrete providers for the VIN report service.
//!
//! ## Providers
//!
//! - **NHTSA vPIC** (default): VIN decoding via the public vPIC API
//! - **SendGrid** (default): report delivery via the v3 mail API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vin_runtime::{NhtsaDecoder, nhtsa::NhtsaConfig};
//!
//! let decoder = NhtsaDecoder::from_config(NhtsaConfig::default())?;
//! let attributes = decoder.decode(&Vin::parse("1HGCM82633A004352")?).await?;
//! ```

#[cfg(feature = "nhtsa")]
pub mod nhtsa;

#[cfg(feature = "sendgrid")]
pub mod sendgrid;

#[cfg(feature = "nhtsa")]
pub use nhtsa::NhtsaDecoder;

#[cfg(feature = "sendgrid")]
pub use sendgrid::SendGridMailer;

// Re-export core types for convenience
pub use vin_core::{DecodedAttributes, MailSender, OutgoingMail, ReportError, Result, VinDecoder};
