//! Service Configuration
//!
//! Built once at process start and handed to each component's constructor.
//! Business logic never reads the environment itself.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ReportError, Result};
use crate::model::{Currency, PriceConfig};

/// Default NHTSA vPIC endpoint
pub const DEFAULT_DECODER_URL: &str = "https://vpic.nhtsa.dot.gov/api/vehicles";

/// Default SendGrid v3 send endpoint
pub const DEFAULT_MAIL_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Mail provider settings
#[derive(Clone, Debug)]
pub struct MailConfig {
    /// API key for the mail provider
    pub api_key: String,

    /// "From" address on every report
    pub from: String,

    /// Send endpoint
    pub api_url: String,
}

/// Where the processor sends the customer after checkout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectConfig {
    /// Public base URL, e.g. `https://reports.example.com`
    pub domain: String,
}

impl RedirectConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}/success.html", self.domain)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/cancel.html", self.domain)
    }
}

/// Complete service configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Payment processor secret key
    pub stripe_secret_key: String,

    pub mail: MailConfig,

    pub redirect: RedirectConfig,

    /// Interface to bind
    pub bind_host: String,

    /// Listening port
    pub port: u16,

    /// Price of one report
    pub price: PriceConfig,

    /// Currencies the checkout accepts
    pub supported_currencies: Vec<Currency>,

    /// Base URL of the VIN decoder
    pub decoder_url: String,

    /// Upper bound on every external call
    pub call_timeout: Duration,

    /// Verify the checkout session server-side and keep a fulfillment ledger
    pub require_verified_payment: bool,

    /// Ledger snapshot file (in-memory ledger when unset)
    pub ledger_path: Option<PathBuf>,
}

impl AppConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from any key lookup (environment, map, ...)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ReportError::Config(format!("{key} not set")))
        };

        let port = parse_or(&lookup, "PORT", 10000_u16)?;
        let amount_minor = parse_or(&lookup, "PRICE_AMOUNT", 500_i64)?;
        let currency = match lookup("PRICE_CURRENCY") {
            Some(raw) => raw.parse()?,
            None => Currency::Usd,
        };
        let supported_currencies = match lookup("SUPPORTED_CURRENCIES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect::<Result<Vec<Currency>>>()?,
            None => vec![Currency::Usd, Currency::Cad],
        };
        let timeout_secs = parse_or(&lookup, "CALL_TIMEOUT_SECS", 10_u64)?;
        let require_verified_payment = parse_or(&lookup, "REQUIRE_VERIFIED_PAYMENT", true)?;

        let config = Self {
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            mail: MailConfig {
                api_key: required("MAIL_API_KEY")?,
                from: required("MAIL_FROM")?,
                api_url: lookup("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_API_URL.into()),
            },
            redirect: RedirectConfig::new(required("DOMAIN")?),
            bind_host: lookup("BIND_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            price: PriceConfig {
                amount_minor,
                currency,
            },
            supported_currencies,
            decoder_url: lookup("DECODER_URL").unwrap_or_else(|| DEFAULT_DECODER_URL.into()),
            call_timeout: Duration::from_secs(timeout_secs),
            require_verified_payment,
            ledger_path: lookup("LEDGER_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        if config.call_timeout.is_zero() {
            return Err(ReportError::Config("CALL_TIMEOUT_SECS must be positive".into()));
        }

        tracing::debug!(
            port = config.port,
            currency = %config.price.currency,
            amount = config.price.amount_minor,
            verified = config.require_verified_payment,
            "Loaded configuration"
        );

        Ok(config)
    }

    /// `host:port` to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ReportError::Config(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("MAIL_API_KEY", "SG.key"),
            ("MAIL_FROM", "reports@example.com"),
            ("DOMAIN", "https://reports.example.com/"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig> {
        AppConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.port, 10000);
        assert_eq!(config.price, PriceConfig::default());
        assert_eq!(config.supported_currencies, vec![Currency::Usd, Currency::Cad]);
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert!(config.require_verified_payment);
        assert!(config.ledger_path.is_none());
        assert_eq!(config.mail.api_url, DEFAULT_MAIL_API_URL);
        assert_eq!(
            config.redirect.success_url(),
            "https://reports.example.com/success.html"
        );
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let mut vars = base();
        vars.remove("STRIPE_SECRET_KEY");
        let err = load(&vars).unwrap_err();
        assert_eq!(err, ReportError::Config("STRIPE_SECRET_KEY not set".into()));
    }

    #[test]
    fn test_price_overrides() {
        let mut vars = base();
        vars.insert("PRICE_AMOUNT", "799");
        vars.insert("PRICE_CURRENCY", "CAD");
        vars.insert("SUPPORTED_CURRENCIES", "cad, usd");
        vars.insert("REQUIRE_VERIFIED_PAYMENT", "false");
        let config = load(&vars).unwrap();
        assert_eq!(config.price.amount_minor, 799);
        assert_eq!(config.price.currency, Currency::Cad);
        assert!(!config.require_verified_payment);
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = base();
        vars.insert("PORT", "not-a-port");
        assert!(matches!(load(&vars), Err(ReportError::Config(_))));
    }
}
