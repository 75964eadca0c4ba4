//! REST API surface.
//!
//! Handlers stay thin: decode the request, call the coordinator or the auth
//! gateway, map typed outcomes onto the error envelope.

pub mod error;
pub mod handlers;
pub mod types;

use axum::routing::post;
use axum::Router;

use crate::server::AppState;

/// API routes, nested under `/api` by the server.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/invoices", post(handlers::invoices::submit_invoice))
        .route("/v1/invoices/verify", post(handlers::invoices::verify_invoice))
        .route("/v1/invoices/paid", post(handlers::invoices::mark_paid))
        .route("/v1/users/register", post(handlers::users::register))
        .route("/v1/users/login", post(handlers::users::login))
}
