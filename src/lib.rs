// KopaKopi - Retrieval-augmented menu assistant for a coffee shop

pub mod agents;
pub mod config;
pub mod embeddings;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
