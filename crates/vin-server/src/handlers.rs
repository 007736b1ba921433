//! HTTP Handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use vin_core::{ReportError, VehiclePreview};
use vin_report::{FulfillRequest, FulfillmentStage, PreviewOutcome, StageError};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub verification_enabled: bool,
    pub ledger_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,

    /// Pipeline stage that failed, for `/send-report`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<FulfillmentStage>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub vin: String,
}

/// Preview body: the vehicle summary, or a soft lookup failure
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PreviewResponse {
    Found(VehiclePreview),
    LookupFailed(ErrorResponse),
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub vin: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SendReportRequest {
    #[serde(default)]
    pub vin: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendReportResponse {
    pub success: bool,
}

// ============================================================================
// Error mapping
// ============================================================================

pub const fn status_for(err: &ReportError) -> StatusCode {
    match err {
        ReportError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ReportError::PaymentNotVerified(_) => StatusCode::PAYMENT_REQUIRED,
        ReportError::AlreadyFulfilled | ReportError::FulfillmentInProgress => StatusCode::CONFLICT,
        ReportError::DecodeFailure(_)
        | ReportError::PaymentError(_)
        | ReportError::DeliveryError(_) => StatusCode::BAD_GATEWAY,
        ReportError::Ledger(_) | ReportError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: &ReportError, stage: Option<FulfillmentStage>) -> ApiError {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.user_message(),
            code: err.code().into(),
            stage,
        }),
    )
}

/// Malformed body or query string, reported in the same JSON shape
fn bad_request(detail: &str) -> ApiError {
    reject(&ReportError::InvalidInput(detail.to_string()), None)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        verification_enabled: state.orchestrator.verification_enabled(),
        ledger_enabled: state.orchestrator.ledger_enabled(),
    })
}

/// `GET /preview?vin=`
pub async fn preview_query(
    State(state): State<AppState>,
    query: Result<Query<PreviewRequest>, QueryRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let Query(query) = query.map_err(|e| bad_request(&e.body_text()))?;
    preview(&state, &query.vin).await
}

/// `POST /preview` with `{ vin }`
pub async fn preview_json(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| bad_request(&e.body_text()))?;
    preview(&state, &payload.vin).await
}

async fn preview(state: &AppState, vin: &str) -> Result<Json<PreviewResponse>, ApiError> {
    let outcome = state
        .orchestrator
        .preview(vin)
        .await
        .map_err(|e| reject(&e, None))?;

    Ok(Json(match outcome {
        PreviewOutcome::Found(preview) => PreviewResponse::Found(preview),
        PreviewOutcome::LookupFailed { message } => PreviewResponse::LookupFailed(ErrorResponse {
            error: message,
            code: "LOOKUP_FAILED".into(),
            stage: None,
        }),
    }))
}

/// Create a hosted checkout session for one report
pub async fn create_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| bad_request(&e.body_text()))?;
    let url = state
        .orchestrator
        .start_checkout(&payload.vin, &payload.email)
        .await
        .map_err(|e| {
            tracing::error!("Checkout error: {}", e);
            reject(&e, None)
        })?;

    Ok(Json(CheckoutResponse { url }))
}

/// Release the paid report by email
///
/// The pipeline runs on its own task, so a client that disconnects mid-send
/// does not cut delivery short.
pub async fn send_report(
    State(state): State<AppState>,
    payload: Result<Json<SendReportRequest>, JsonRejection>,
) -> Result<Json<SendReportResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| bad_request(&e.body_text()))?;
    let request = FulfillRequest {
        vin: payload.vin,
        email: payload.email,
        session_id: payload.session_id,
    };

    let orchestrator = state.orchestrator.clone();
    let outcome = tokio::spawn(async move { orchestrator.fulfill(&request).await })
        .await
        .map_err(|e| {
            tracing::error!("Fulfillment task failed: {}", e);
            reject(
                &ReportError::DeliveryError(format!("fulfillment task failed: {e}")),
                None,
            )
        })?;

    outcome.map_err(|StageError { stage, error }| reject(&error, Some(stage)))?;

    Ok(Json(SendReportResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ReportError::InvalidInput("x".into()), 400),
            (ReportError::PaymentNotVerified("x".into()), 402),
            (ReportError::AlreadyFulfilled, 409),
            (ReportError::FulfillmentInProgress, 409),
            (ReportError::DecodeFailure("x".into()), 502),
            (ReportError::PaymentError("x".into()), 502),
            (ReportError::DeliveryError("x".into()), 502),
            (ReportError::Ledger("x".into()), 500),
            (ReportError::Config("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err).as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn test_error_body_omits_missing_stage() {
        let (_, Json(body)) = reject(&ReportError::AlreadyFulfilled, None);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "ALREADY_FULFILLED");
        assert!(json.get("stage").is_none());
    }
}
