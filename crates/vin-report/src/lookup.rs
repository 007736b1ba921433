//! Vehicle Lookup
//!
//! Calls the decoder and normalizes its attribute list into a
//! [`VehicleRecord`]. No retries here.

use std::collections::BTreeMap;
use std::sync::Arc;

use vin_core::{
    DecodedAttributes, FieldValue, ReportError, Result, VehicleRecord, Vin, VinDecoder,
};

const MAKE_KEYS: &[&str] = &["make"];
const MODEL_KEYS: &[&str] = &["model"];
const YEAR_KEYS: &[&str] = &["modelyear", "year"];

/// Decoder-backed lookup of canonical vehicle records
pub struct VehicleLookup {
    decoder: Arc<dyn VinDecoder>,
}

impl VehicleLookup {
    pub fn new(decoder: Arc<dyn VinDecoder>) -> Self {
        Self { decoder }
    }

    /// Decode raw VIN input
    ///
    /// Blank input fails with `InvalidInput` without contacting the decoder.
    pub async fn decode(&self, vin: &str) -> Result<VehicleRecord> {
        let vin = Vin::parse(vin)?;
        self.decode_vin(&vin).await
    }

    /// Decode an already validated VIN
    pub async fn decode_vin(&self, vin: &Vin) -> Result<VehicleRecord> {
        let attributes = self.decoder.decode(vin).await.map_err(|e| match e {
            ReportError::DecodeFailure(_) => e,
            other => ReportError::DecodeFailure(other.to_string()),
        })?;

        let record = normalize(vin.clone(), &attributes)?;

        tracing::info!(
            decoder = self.decoder.name(),
            vin = %vin,
            make = %record.make(),
            model = %record.model(),
            year = %record.year(),
            "Decoded vehicle"
        );

        Ok(record)
    }
}

/// Compare attribute names ignoring case and separators (`_`, `-`, space)
fn canonical(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_one_of(name: &str, keys: &[&str]) -> bool {
    let name = canonical(name);
    keys.contains(&name.as_str())
}

/// Map a decoder attribute list into a record
///
/// Missing or blank values become `Unknown`. A response that resolves none of
/// make, model or year is unusable.
pub fn normalize(vin: Vin, decoded: &DecodedAttributes) -> Result<VehicleRecord> {
    let headline = |keys: &[&str]| {
        let value = decoded
            .fields
            .iter()
            .filter(|(name, _)| is_one_of(name, keys))
            .map(|(_, value)| FieldValue::from_decoded(Some(value.as_str())))
            .find(FieldValue::is_known);
        value.unwrap_or_default()
    };

    let make = headline(MAKE_KEYS);
    let model = headline(MODEL_KEYS);
    let year = headline(YEAR_KEYS);

    if !make.is_known() && !model.is_known() && !year.is_known() {
        return Err(ReportError::DecodeFailure(format!(
            "decoder could not identify vehicle {vin}"
        )));
    }

    let attributes: BTreeMap<String, FieldValue> = decoded
        .fields
        .iter()
        .filter(|(name, _)| {
            !is_one_of(name, MAKE_KEYS) && !is_one_of(name, MODEL_KEYS) && !is_one_of(name, YEAR_KEYS)
        })
        .map(|(name, value)| (name.clone(), FieldValue::from_decoded(Some(value.as_str()))))
        .collect();

    Ok(VehicleRecord::new(vin, make, model, year, attributes))
}
