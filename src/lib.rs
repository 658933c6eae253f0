//! Unit billing service.
//!
//! Users buy usage units (hours) through payments. A purchase is opened as a
//! pending transaction; once the payment gateway reports success the caller
//! validates it by reference, which marks it successful and credits the
//! purchased units to the owner's balance exactly once.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum
//! - **Storage**: repository traits, with PostgreSQL (sqlx) and in-process implementations
//! - **Authentication**: API key with SHA-256 hashing
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP router.
///
/// Every route except `/health` requires an API key.
pub fn router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_own_transactions),
        )
        .route(
            "/api/v1/transactions/create",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/v1/transactions/list",
            get(handlers::transactions::list_all_transactions),
        )
        .route(
            "/api/v1/transactions/validate/{reference}",
            put(handlers::transactions::validate_transaction),
        )
        // Static segments above take priority over this capture
        .route(
            "/api/v1/transactions/{reference}",
            get(handlers::transactions::get_transaction),
        )
        .route("/api/v1/balance", get(handlers::balances::get_balance))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
