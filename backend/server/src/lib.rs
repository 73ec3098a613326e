//! Backend of a pay-to-enter page that shows how many people have entered.
//!
//!
//!
//! # Flow
//! - Homepage fetches `GET /count` on load and again whenever the tab regains focus
//! - Visitor pays through a hosted checkout, the provider redirects to the success page with `?session_id=...`
//! - Success page posts that id to `POST /register-entry` once per page load
//! - Reloading the success page replays the same id, which must not count twice
//!
//!
//!
//! # Counting
//!
//! **Goal**: one entry per completed payment, with no transactions and no locks.
//!
//! - Seen session ids live in a set on the key-value store, the count in an integer beside it
//! - `SADD` both checks and inserts, so exactly one request per id sees "new"
//! - Only that request runs `INCR`, and answers with the value `INCR` returned
//! - Every other request for the id reads the count instead
//! - Nothing is cached or locked in process, requests may land on different machines
//!
//!
//!
//! # Degrading
//!
//! Counting is decoration, it never breaks the page.
//! - Store down or unconfigured: `/count` shows 0
//! - Store down or unconfigured: `/register-entry` answers `{"count": 0, "ok": false}`
//! - Only a missing `session_id` is reported back as an error
//!
//!
//!
//! # Setup
//!
//! Run against a hosted store.
//! ```sh
//! UPSTASH_REDIS_REST_URL=https://... UPSTASH_REDIS_REST_TOKEN=... cargo run -p entry
//! ```
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://localhost:6379 RUST_LOG=info cargo run -p entry
//! ```
//!
//! Hammer one session id from many clients.
//! ```sh
//! cargo run -p tester -- http://localhost:3000 cs_test_123 --concurrency 50
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod backend;
pub mod config;
pub mod error;
pub mod reader;
pub mod registrar;
pub mod routes;
pub mod state;
pub mod verify;

use routes::{count_handler, register_handler};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/count", get(count_handler))
        .route("/register-entry", post(register_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
