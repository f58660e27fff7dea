//! Waterworks Billing - API Server Binary
//!
//! This binary starts the HTTP API server for the water billing system.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin waterworks-api
//!
//! # Run with environment variables
//! API_HOST=0.0.0.0 API_PORT=8080 DATABASE_URL=postgres://... cargo run --bin waterworks-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_DATABASE_URL` / `DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_RATE_PER_UNIT` - Flat charge per consumed unit (default: 100)
//! * `API_CURRENCY` - Billing currency code (default: KES)
//! * `API_REJECT_OVERPAYMENT` - Reject payments above the bill balance (default: false)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_billing::BillingEngine;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
use interface_api::{config::ApiConfig, create_router, sms::LogOnlySmsGateway, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, establishes the database
/// connection, wires the billing engine, and starts the HTTP server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting Waterworks Billing API Server"
    );

    // Database pool and schema
    let db_config = DatabaseConfig::new(config.database_url.as_str());
    let transaction_timeout = db_config.transaction_timeout;
    let pool = create_pool(db_config).await?;
    run_migrations(&pool).await?;

    // Billing engine over the PostgreSQL ledger and the SMS gateway
    let ledger = Arc::new(
        PostgresLedgerStore::new(pool.clone()).with_transaction_timeout(transaction_timeout),
    );
    let gateway = Arc::new(LogOnlySmsGateway::new());
    let engine = BillingEngine::new(ledger, gateway, config.billing_config()?);

    let app = create_router(AppState::new(engine, Some(pool)));

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables.
///
/// Falls back to individual env vars and defaults when the prefixed
/// configuration is incomplete.
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|_| {
        let defaults = ApiConfig::default();
        ApiConfig {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("API_DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            log_level: std::env::var("API_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            rate_per_unit: std::env::var("API_RATE_PER_UNIT")
                .ok()
                .and_then(|r| r.parse().ok())
                .unwrap_or(defaults.rate_per_unit),
            currency: std::env::var("API_CURRENCY").unwrap_or(defaults.currency),
            reject_overpayment: std::env::var("API_REJECT_OVERPAYMENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reject_overpayment),
        }
    })
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// This enables graceful shutdown of the server, allowing in-flight
/// requests to complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
