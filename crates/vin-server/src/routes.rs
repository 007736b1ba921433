//! Router

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{create_checkout, health_check, preview_json, preview_query, send_report};
use crate::state::AppState;

/// API routes with CORS and request tracing
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/preview", get(preview_query).post(preview_json))
        .route("/create-checkout", post(create_checkout))
        .route("/send-report", post(send_report))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use vin_core::{Currency, PriceConfig, RedirectConfig, ReportError};
    use vin_payments::mock::{MockPaymentGateway, MockPaymentVerifier};
    use vin_payments::{MemoryLedger, PaymentSessionFactory};
    use vin_report::mock::{MockDecoder, MockMailer};
    use vin_report::{FulfillmentOrchestrator, ReportDelivery, VehicleLookup};

    const VIN: &str = "1HGCM82633A004352";

    fn orchestrator(
        decoder: MockDecoder,
        gateway: MockPaymentGateway,
        mailer: Arc<MockMailer>,
    ) -> FulfillmentOrchestrator {
        FulfillmentOrchestrator::new(
            VehicleLookup::new(Arc::new(decoder)),
            PaymentSessionFactory::new(Arc::new(gateway), vec![Currency::Usd]),
            ReportDelivery::new(mailer, "reports@example.com"),
            PriceConfig::default(),
            RedirectConfig::new("https://reports.example.com"),
        )
    }

    fn app(orchestrator: FulfillmentOrchestrator) -> Router {
        router(AppState::new(orchestrator))
    }

    fn happy_app(mailer: Arc<MockMailer>) -> Router {
        app(orchestrator(
            MockDecoder::honda_civic(),
            MockPaymentGateway::new(),
            mailer,
        ))
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        post_raw(uri, &body.to_string())
    }

    fn post_raw(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn gated_app(mailer: Arc<MockMailer>) -> Router {
        app(
            orchestrator(MockDecoder::honda_civic(), MockPaymentGateway::new(), mailer)
                .with_verifier(Arc::new(MockPaymentVerifier::paid()))
                .with_ledger(Arc::new(MemoryLedger::new())),
        )
    }

    fn paid_request() -> Value {
        json!({ "vin": VIN, "email": "buyer@example.com", "session_id": "cs_test_1" })
    }

    #[tokio::test]
    async fn test_health() {
        let app = happy_app(Arc::new(MockMailer::new()));
        let (status, body) = call(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["verification_enabled"], false);
    }

    #[tokio::test]
    async fn test_preview_get_and_post() {
        let app = happy_app(Arc::new(MockMailer::new()));
        let expected = json!({ "vin": VIN, "make": "Honda", "model": "Civic", "year": "2020" });

        let (status, body) = call(&app, get_req(&format!("/preview?vin={VIN}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);

        let (status, body) = call(&app, post_json("/preview", &json!({ "vin": VIN }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_preview_without_vin_is_bad_request() {
        let app = happy_app(Arc::new(MockMailer::new()));
        let (status, body) = call(&app, get_req("/preview")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_preview_lookup_failure_is_soft() {
        let app = app(orchestrator(
            MockDecoder::failing(ReportError::DecodeFailure("vPIC unreachable".into())),
            MockPaymentGateway::new(),
            Arc::new(MockMailer::new()),
        ));
        let (status, body) = call(&app, get_req(&format!("/preview?vin={VIN}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], "LOOKUP_FAILED");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_create_checkout_returns_url() {
        let app = happy_app(Arc::new(MockMailer::new()));
        let (status, body) = call(
            &app,
            post_json("/create-checkout", &json!({ "vin": VIN, "email": "buyer@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_mock1");
    }

    #[tokio::test]
    async fn test_create_checkout_processor_failure() {
        let app = app(orchestrator(
            MockDecoder::honda_civic(),
            MockPaymentGateway::failing("Invalid API Key provided"),
            Arc::new(MockMailer::new()),
        ));
        let (status, body) = call(
            &app,
            post_json("/create-checkout", &json!({ "vin": VIN, "email": "buyer@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "PAYMENT_ERROR");
    }

    #[tokio::test]
    async fn test_send_report_delivers() {
        let mailer = Arc::new(MockMailer::new());
        let app = happy_app(mailer.clone());

        let (status, body) = call(
            &app,
            post_json("/send-report", &json!({ "vin": VIN, "email": "buyer@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        assert_eq!(mailer.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_report_missing_email_is_bad_request() {
        let mailer = Arc::new(MockMailer::new());
        let app = happy_app(mailer.clone());

        let (status, body) = call(&app, post_json("/send-report", &json!({ "vin": VIN }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
        assert_eq!(body["stage"], "validate");
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_report_unpaid_session() {
        let mailer = Arc::new(MockMailer::new());
        let app = app(
            orchestrator(MockDecoder::honda_civic(), MockPaymentGateway::new(), mailer.clone())
                .with_verifier(Arc::new(MockPaymentVerifier::unpaid())),
        );

        let (status, body) = call(
            &app,
            post_json(
                "/send-report",
                &json!({ "vin": VIN, "email": "buyer@example.com", "session_id": "cs_test_1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["code"], "PAYMENT_NOT_VERIFIED");
        assert_eq!(body["stage"], "verify");
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_report_replay_is_conflict() {
        let mailer = Arc::new(MockMailer::new());
        let app = app(
            orchestrator(MockDecoder::honda_civic(), MockPaymentGateway::new(), mailer.clone())
                .with_verifier(Arc::new(MockPaymentVerifier::paid()))
                .with_ledger(Arc::new(MemoryLedger::new())),
        );
        let request = json!({ "vin": VIN, "email": "buyer@example.com", "session_id": "cs_test_1" });

        let (status, _) = call(&app, post_json("/send-report", &request)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, post_json("/send-report", &request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_FULFILLED");
        assert_eq!(mailer.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_report_delivery_failure() {
        let app = app(orchestrator(
            MockDecoder::honda_civic(),
            MockPaymentGateway::new(),
            Arc::new(MockMailer::failing("HTTP 503")),
        ));
        let (status, body) = call(
            &app,
            post_json("/send-report", &json!({ "vin": VIN, "email": "buyer@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "DELIVERY_ERROR");
        assert_eq!(body["stage"], "deliver");
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_bad_request() {
        let mailer = Arc::new(MockMailer::new());
        let app = happy_app(mailer.clone());

        for uri in ["/preview", "/create-checkout", "/send-report"] {
            let (status, body) = call(&app, post_raw(uri, r#"{"vin": 12"#)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["code"], "INVALID_INPUT", "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_json_bad_request() {
        let app = happy_app(Arc::new(MockMailer::new()));
        let (status, body) = call(
            &app,
            post_json("/send-report", &json!({ "vin": 12, "email": "buyer@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_send_report_finishes_after_client_disconnect() {
        let mailer = Arc::new(MockMailer::new().with_delay(Duration::from_millis(100)));
        let app = gated_app(mailer.clone());

        let dropped = tokio::time::timeout(
            Duration::from_millis(20),
            call(&app, post_json("/send-report", &paid_request())),
        )
        .await;
        assert!(dropped.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(mailer.sent().len(), 1);

        let (status, body) = call(&app, post_json("/send-report", &paid_request())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_FULFILLED");
        assert_eq!(mailer.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_send_report_is_in_progress() {
        let mailer = Arc::new(MockMailer::new().with_delay(Duration::from_millis(50)));
        let app = gated_app(mailer.clone());

        let (first, second) = tokio::join!(
            call(&app, post_json("/send-report", &paid_request())),
            call(&app, post_json("/send-report", &paid_request())),
        );

        let mut statuses = [first.0, second.0];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

        let conflict = if first.0 == StatusCode::CONFLICT { first.1 } else { second.1 };
        assert_eq!(conflict["code"], "FULFILLMENT_IN_PROGRESS");
        assert_eq!(conflict["stage"], "claim");
        assert_eq!(mailer.calls(), 1);
    }
}
