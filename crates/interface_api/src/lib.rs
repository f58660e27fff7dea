//! HTTP API Layer
//!
//! This crate provides the REST API for the water billing system using
//! Axum. Handlers are thin translators: request in, engine call, response
//! out. Authentication and route guarding belong to an outer layer and are
//! not part of this surface.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(engine, Some(pool)));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod sms;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_billing::BillingEngine;

use crate::handlers::{billing, health};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The billing transaction core
    pub engine: BillingEngine,
    /// Connection pool for readiness checks; absent when the ledger is
    /// not database-backed (tests)
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Creates the shared state
    pub fn new(engine: BillingEngine, pool: Option<PgPool>) -> Self {
        Self { engine, pool }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no billing surface)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Billing routes
    let billing_routes = Router::new()
        .route("/readings", post(billing::submit_reading))
        .route("/payments", post(billing::record_payment))
        .route("/bills/:id", get(billing::get_bill))
        .route("/bills/:id/payments", get(billing::list_bill_payments));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", billing_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
