//! HTTP API server over a shared multi quin tree.

use std::sync::Arc;

use axum::Router;
use quin_tree::{MultiQuinTree, PoseidonHasher};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod routes;

use config::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub tree: MultiQuinTree,
}

pub type SharedState = Arc<RwLock<AppState>>;

/// Build the router over `state`.
pub fn app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quin tree server...");

    let config = ServerConfig::from_env()?;
    let hasher = Arc::new(PoseidonHasher::new(config.tree.arity.get()));
    let tree = MultiQuinTree::new(config.tree.clone(), hasher)?;
    tracing::info!(
        depth = tree.depth(),
        arity = tree.arity(),
        capacity = tree.capacity(),
        "Tree ready"
    );

    let state = Arc::new(RwLock::new(AppState { tree }));
    let app = app(state);

    // Start server
    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
