//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::SharedState;

/// Create API routes
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Leaf endpoints
        .route("/api/leaves", post(handlers::insert_leaf))
        .route(
            "/api/leaves/:index",
            get(handlers::get_leaf).put(handlers::update_leaf),
        )
        .route("/api/roots", get(handlers::roots))
        // Proof endpoints
        .route("/api/path/:index", get(handlers::merkle_path))
        .route("/api/subroot-path", post(handlers::subroot_path))
        .route("/api/verify", post(handlers::verify))
}
