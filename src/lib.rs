//! Short-link service backed by SQLite.
//!
//! [`store::UrlStore`] owns the code/origin table and its allocation
//! protocol; everything else here is the HTTP surface around it.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod code;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod probe;
pub mod store;

pub use error::StoreError;
pub use store::{StoreOptions, UrlStore};

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub store: UrlStore,
    pub config: config::AppConfig,
    /// Reachability check run on every submitted origin before allocation.
    pub probe: Arc<dyn probe::OriginProbe>,
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::page::index))
        .route("/page", get(handlers::page::page))
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/api", post(handlers::shorten::shorten))
        // Short-link redirect; static routes above take priority
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
