//! Domain Models
//!
//! Core data types for the VIN report workflow. Decoded values that the
//! decoder could not resolve are carried as [`FieldValue::Unknown`], never as
//! an empty string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ReportError, Result};

/// Marker rendered for any field the decoder did not resolve
pub const UNKNOWN_MARKER: &str = "unknown";

/// Vehicle identification number
///
/// Opaque: the only check is "non-empty after trimming". A VIN that is not a
/// real 17-character identifier fails later, at decode time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Vin(String);

impl Vin {
    /// Parse from raw client input
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReportError::InvalidInput("VIN is required".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Vin {
    type Error = ReportError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<Vin> for String {
    fn from(vin: Vin) -> Self {
        vin.0
    }
}

/// Syntactically well-formed recipient address
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    const MAX_LEN: usize = 254;

    /// Parse and validate an address
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReportError::InvalidInput("email is required".into()));
        }
        if !is_well_formed_email(trimmed) {
            return Err(ReportError::InvalidInput(format!(
                "'{trimmed}' is not a valid email address"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used for comparisons and ledger keys
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Address safe to put in logs: `j***@example.com`
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().unwrap_or('*');
                format!("{first}***@{domain}")
            }
            None => "***".into(),
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ReportError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

fn is_well_formed_email(s: &str) -> bool {
    if s.len() > EmailAddress::MAX_LEN {
        return false;
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }
    domain
        .split('.')
        .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

/// A decoded value, or the explicit absence of one
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum FieldValue {
    Known(String),
    #[default]
    Unknown,
}

impl FieldValue {
    /// Blank or missing decoder output becomes `Unknown`
    pub fn from_decoded(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => Self::Known(value.to_string()),
            _ => Self::Unknown,
        }
    }

    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// The value, or [`UNKNOWN_MARKER`]
    pub fn display(&self) -> &str {
        match self {
            Self::Known(value) => value,
            Self::Unknown => UNKNOWN_MARKER,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// Canonical decoded vehicle
///
/// Immutable once built; only the lookup component constructs one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VehicleRecord {
    vin: Vin,
    make: FieldValue,
    model: FieldValue,
    year: FieldValue,
    attributes: BTreeMap<String, FieldValue>,
}

impl VehicleRecord {
    pub const fn new(
        vin: Vin,
        make: FieldValue,
        model: FieldValue,
        year: FieldValue,
        attributes: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            vin,
            make,
            model,
            year,
            attributes,
        }
    }

    pub const fn vin(&self) -> &Vin {
        &self.vin
    }

    pub const fn make(&self) -> &FieldValue {
        &self.make
    }

    pub const fn model(&self) -> &FieldValue {
        &self.model
    }

    pub const fn year(&self) -> &FieldValue {
        &self.year
    }

    /// Every other decoded attribute, ordered by name
    pub const fn attributes(&self) -> &BTreeMap<String, FieldValue> {
        &self.attributes
    }

    /// Stripped-down view for the free preview
    pub fn preview(&self) -> VehiclePreview {
        VehiclePreview {
            vin: self.vin.to_string(),
            make: self.make.display().to_string(),
            model: self.model.display().to_string(),
            year: self.year.display().to_string(),
        }
    }
}

/// Free preview returned before payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePreview {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: String,
}

/// Currencies the checkout may be priced in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Cad,
    Eur,
    Gbp,
}

impl Currency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Cad => "cad",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
        }
    }
}

impl FromStr for Currency {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "cad" => Ok(Self::Cad),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            other => Err(ReportError::Config(format!("unsupported currency '{other}'"))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed price of one report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceConfig {
    /// Amount in minor currency units (cents)
    pub amount_minor: i64,

    pub currency: Currency,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            amount_minor: 500,
            currency: Currency::Usd,
        }
    }
}

/// Rendered report content
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// A report on its way to a recipient; never stored
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub vin: Vin,
    pub recipient: String,
    pub body: ReportBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vin_rejects_blank_input() {
        assert!(matches!(Vin::parse(""), Err(ReportError::InvalidInput(_))));
        assert!(matches!(Vin::parse("   \t"), Err(ReportError::InvalidInput(_))));
    }

    #[test]
    fn test_vin_is_opaque() {
        // Not a valid 17-character VIN, but that is the decoder's call
        let vin = Vin::parse("  abc ").unwrap();
        assert_eq!(vin.as_str(), "abc");
    }

    #[test]
    fn test_email_validation() {
        for good in ["buyer@example.com", "a.b+tag@sub.example.co.uk", " x@y.io "] {
            assert!(EmailAddress::parse(good).is_ok(), "{good} should parse");
        }
        for bad in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@localhost",
            "user@@example.com",
            "us er@example.com",
            "user@exa..mple.com",
            "user@-example.com",
        ] {
            assert!(
                matches!(EmailAddress::parse(bad), Err(ReportError::InvalidInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_email_masking() {
        let email = EmailAddress::parse("jane@example.com").unwrap();
        assert_eq!(email.masked(), "j***@example.com");
    }

    #[test]
    fn test_field_value_from_blank_is_unknown() {
        assert_eq!(FieldValue::from_decoded(Some("  ")), FieldValue::Unknown);
        assert_eq!(FieldValue::from_decoded(None), FieldValue::Unknown);
        assert_eq!(FieldValue::Unknown.display(), "unknown");
        assert_eq!(
            FieldValue::from_decoded(Some("Honda")),
            FieldValue::Known("Honda".into())
        );
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("cad".parse::<Currency>().unwrap(), Currency::Cad);
        assert!("btc".parse::<Currency>().is_err());
    }

    #[test]
    fn test_deserialize_goes_through_parse() {
        assert!(serde_json::from_str::<Vin>(r#""   ""#).is_err());
        assert!(serde_json::from_str::<EmailAddress>(r#""not-an-email""#).is_err());

        let vin: Vin = serde_json::from_str(r#"" 1HGCM82633A004352 ""#).unwrap();
        assert_eq!(vin.as_str(), "1HGCM82633A004352");
        assert_eq!(serde_json::to_string(&vin).unwrap(), r#""1HGCM82633A004352""#);
    }
}
