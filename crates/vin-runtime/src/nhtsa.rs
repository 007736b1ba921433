//! NHTSA vPIC Decoder
//!
//! Implementation of `VinDecoder` against the public vPIC
//! `DecodeVinValues` endpoint, which answers with one flat record of
//! string attributes per VIN.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use vin_core::{
    capability::{DecodedAttributes, VinDecoder},
    config::DEFAULT_DECODER_URL,
    error::{ReportError, Result},
    model::Vin,
};

/// vPIC bookkeeping fields that are not vehicle attributes
const META_FIELDS: &[&str] = &[
    "ErrorCode",
    "ErrorText",
    "AdditionalErrorText",
    "SuggestedVIN",
    "PossibleValues",
    "VIN",
];

/// Decoder provider configuration
#[derive(Clone, Debug)]
pub struct NhtsaConfig {
    /// API base URL
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for NhtsaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DECODER_URL.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VpicResponse {
    #[serde(rename = "Results", default)]
    results: Vec<serde_json::Map<String, Value>>,
}

/// NHTSA vPIC decoder
pub struct NhtsaDecoder {
    client: Client,
    config: NhtsaConfig,
}

impl NhtsaDecoder {
    /// Create from configuration
    pub fn from_config(config: NhtsaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReportError::Config(format!("decoder HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn decode_url(&self, vin: &Vin) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ReportError::Config(format!("invalid decoder URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ReportError::Config("decoder URL cannot be a base".into()))?
            .pop_if_empty()
            .push("DecodeVinValues")
            .push(vin.as_str());
        url.query_pairs_mut().append_pair("format", "json");
        Ok(url)
    }

    /// Turn a vPIC JSON body into an attribute list
    pub fn parse_response(body: &str) -> Result<DecodedAttributes> {
        let response: VpicResponse = serde_json::from_str(body)
            .map_err(|e| ReportError::DecodeFailure(format!("malformed decoder response: {e}")))?;

        let record = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ReportError::DecodeFailure("decoder returned no results".into()))?;

        let text = |key: &str| record.get(key).and_then(Value::as_str).unwrap_or("").trim();

        let error_code = text("ErrorCode");
        let clean = error_code.is_empty() || error_code.split(',').any(|c| c.trim() == "0");
        if !clean && text("Make").is_empty() {
            let reason = match text("ErrorText") {
                "" => format!("decoder error code {error_code}"),
                msg => msg.to_string(),
            };
            return Err(ReportError::DecodeFailure(reason));
        }

        Ok(record
            .iter()
            .filter(|(key, _)| !META_FIELDS.contains(&key.as_str()))
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key.clone(), s.clone())),
                Value::Number(n) => Some((key.clone(), n.to_string())),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl VinDecoder for NhtsaDecoder {
    async fn decode(&self, vin: &Vin) -> Result<DecodedAttributes> {
        let url = self.decode_url(vin)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReportError::DecodeFailure(format!("decoder unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::DecodeFailure(format!(
                "decoder responded with HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::DecodeFailure(format!("reading decoder response: {e}")))?;

        let attributes = Self::parse_response(&body)?;
        tracing::debug!(vin = %vin, fields = attributes.fields.len(), "vPIC decode complete");
        Ok(attributes)
    }

    fn name(&self) -> &str {
        "nhtsa-vpic"
    }
}
