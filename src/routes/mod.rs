//! API Routes
//!
//! - `/api/chat` - Streamed menu answers
//! - `/api/upload` - Admin CSV upload (replaces the index)
//! - `/api/data` - Export of every stored record's metadata
//! - `/api/health` - Health check
//! - `/`, `/admin` - Chat and admin pages

pub mod chat;
pub mod data;
pub mod files;
pub mod health;
pub mod ui;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(chat::router(state.clone()))
        .merge(files::router(state.clone()))
        .merge(data::router(state.clone()))
        .merge(health::router(state))
        .merge(ui::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
