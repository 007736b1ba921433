//! External Capabilities
//!
//! Narrow interfaces to the third-party systems the workflow depends on.
//! The workflow works exclusively through these traits, so a decoder or mail
//! provider can be swapped without touching orchestration logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::Vin;

/// Raw attribute list returned by a decoder
///
/// Keys are the decoder's own attribute names; values are passed through
/// untouched. Blank values are normalized later by the lookup component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedAttributes {
    pub fields: BTreeMap<String, String>,
}

impl DecodedAttributes {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DecodedAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// VIN decoding service
///
/// Implementations report transport and protocol failures as
/// `ReportError::DecodeFailure`.
#[async_trait]
pub trait VinDecoder: Send + Sync {
    /// Decode a VIN into its attribute list
    async fn decode(&self, vin: &Vin) -> Result<DecodedAttributes>;

    /// Provider name, for logs
    fn name(&self) -> &str;
}

/// A fully addressed message ready for the mail provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Transactional mail service
///
/// Implementations report provider failures as `ReportError::DeliveryError`.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;

    /// Provider name, for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_attributes_from_pairs() {
        let attrs: DecodedAttributes = [("Make", "Honda"), ("Model", "Civic")]
            .into_iter()
            .collect();
        assert_eq!(attrs.get("Make"), Some("Honda"));
        assert_eq!(attrs.get("ModelYear"), None);
    }
}
