//! Ridgeline - peak/valley signal classifier and backtester for crypto candles

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use axum::Router;
use config::Config;
use services::{CandleStore, ModelService};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<CandleStore>,
    pub models: Arc<ModelService>,
}

impl AppState {
    pub fn new(config: Config, store: CandleStore) -> Self {
        let models = ModelService::new(config.model_dir.clone());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            models: Arc::new(models),
        }
    }
}

/// Build the HTTP application with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Re-export commonly used types
pub use types::*;
