//! HTTP front for the product registration checker.
//!
//! # Endpoints
//! - `GET /verify?q=&category=`: is this product registered? Counts toward the search tally
//! - `GET /products?category=&search=&page=`: one 30-row page of the catalog
//! - `GET /searches`: `{ "count": n }`, searches verified so far
//! - `GET /health`: liveness
//!
//! # Data Source
//! With `SUPABASE_URL` set, lookups go to the hosted registry (anon key from
//! `SUPABASE_ANON_KEY` or `/run/secrets/SUPABASE_ANON_KEY`). Otherwise
//! `FIXTURE_PATH` names a JSON file `{ "food": [...], "drug": [...] }` served
//! from memory, which is handy for local development.
//!
//! # Setup
//!
//! Run against a fixture.
//! ```sh
//! FIXTURE_PATH=fixture.json RUST_LOG=info cargo run -p server
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use routes::{health_handler, products_handler, searches_handler, verify_handler};
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new(Config::load()?).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/verify", get(verify_handler))
        .route("/products", get(products_handler))
        .route("/searches", get(searches_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
