//! VIN Report HTTP Server
//!
//! Axum server for the pay-per-report flow: free preview, Stripe checkout
//! and emailed report. Static pages (success/cancel) are served from
//! `public/`.

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vin_core::AppConfig;
use vin_payments::{FileLedger, FulfillmentLedger, MemoryLedger, PaymentSessionFactory, StripeClient};
use vin_report::{FulfillmentOrchestrator, ReportDelivery, VehicleLookup};
use vin_runtime::{nhtsa::NhtsaConfig, sendgrid::SendGridConfig, NhtsaDecoder, SendGridMailer};

use crate::state::AppState;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// `RUST_LOG`, which may come from `.env`
fn log_filter() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Providers
    let decoder = Arc::new(NhtsaDecoder::from_config(NhtsaConfig {
        base_url: config.decoder_url.clone(),
        timeout: config.call_timeout,
    })?);
    let mailer = Arc::new(SendGridMailer::from_config(SendGridConfig::from_mail_config(
        &config.mail,
        config.call_timeout,
    ))?);
    let stripe = Arc::new(StripeClient::new(&config.stripe_secret_key)?);

    tracing::info!("✓ Decoder: {}", config.decoder_url);
    tracing::info!("✓ Mail from: {}", config.mail.from);
    tracing::info!(
        "✓ Price: {} {} (accepting {:?})",
        config.price.amount_minor,
        config.price.currency,
        config.supported_currencies
    );

    let mut orchestrator = FulfillmentOrchestrator::new(
        VehicleLookup::new(decoder),
        PaymentSessionFactory::new(stripe.clone(), config.supported_currencies.clone()),
        ReportDelivery::new(mailer, config.mail.from.clone()),
        config.price,
        config.redirect.clone(),
    )
    .with_call_timeout(config.call_timeout);

    if config.require_verified_payment {
        let ledger: Arc<dyn FulfillmentLedger> = match &config.ledger_path {
            Some(path) => {
                tracing::info!("✓ Fulfillment ledger: {}", path.display());
                Arc::new(FileLedger::open(path)?)
            }
            None => {
                tracing::warn!("⚠ LEDGER_PATH not set - fulfillment ledger is in-memory only");
                Arc::new(MemoryLedger::new())
            }
        };
        orchestrator = orchestrator.with_verifier(stripe).with_ledger(ledger);
        tracing::info!("✓ Payment verification enabled");
    } else {
        tracing::warn!("⚠ Payment verification disabled - /send-report trusts the caller");
    }

    let app = routes::router(AppState::new(orchestrator))
        .fallback_service(ServeDir::new("public"));

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 vin-server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health           - Health check");
    tracing::info!("  GET  /preview?vin=     - Free vehicle preview");
    tracing::info!("  POST /create-checkout  - Start Stripe checkout");
    tracing::info!("  POST /send-report      - Email the paid report");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_reads_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=vin_server=trace\n").unwrap();

        dotenvy::from_path_override(&path).unwrap();
        assert_eq!(log_filter(), "vin_server=trace");
    }
}
