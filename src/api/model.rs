//! Model API endpoints: load the bundle, run live inference, report status.

use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, warn};

use super::ApiResponse;
use crate::error::Result;
use crate::types::{ModelStatus, Prediction};
use crate::AppState;

/// Create the model router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/load", get(load_model))
        .route("/run", get(run_model))
        .route("/status", get(model_status))
}

/// Load (or reload) the model bundle from the configured directory.
async fn load_model(State(state): State<AppState>) -> Result<Json<ApiResponse<ModelStatus>>> {
    let bundle = state.models.load().await?;
    info!(
        "Model loaded from {} ({} features)",
        state.models.model_dir().display(),
        bundle.feature_count()
    );
    Ok(Json(ApiResponse::new(bundle.status())))
}

/// Decide on the most recent candle.
async fn run_model(State(state): State<AppState>) -> Result<Json<ApiResponse<Prediction>>> {
    let bundle = state.models.current().await?;
    let candles = state
        .store
        .latest_candles(&state.config.asset, state.config.inference_window)?;

    let mut prediction = bundle.predict_latest(&candles)?;
    prediction.asset = state.config.asset.clone();

    if let Err(e) = state
        .store
        .record_decision(&prediction.asset, prediction.open_time, prediction.decision)
    {
        warn!("Failed to record decision: {}", e);
    }

    info!(
        "{} at {}: {} (p = {:?})",
        prediction.asset, prediction.open_time, prediction.decision, prediction.probabilities
    );
    Ok(Json(ApiResponse::new(prediction)))
}

async fn model_status(State(state): State<AppState>) -> Json<ApiResponse<ModelStatus>> {
    Json(ApiResponse::new(state.models.status().await))
}
