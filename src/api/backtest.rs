//! Backtest API endpoint.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::Backtester;
use crate::types::BacktestReport;
use crate::AppState;

/// Query parameters for the backtest endpoint.
#[derive(Debug, Deserialize)]
pub struct BacktestQuery {
    /// Number of latest candles to replay, at most `BACKTEST_WINDOW`.
    pub limit: Option<usize>,
    /// Starting capital.
    pub balance: Option<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/backtest", get(run_backtest))
}

/// Replay the loaded model over the latest candles.
///
/// The window is capped at the configured backtest window so one request
/// never derives features over the whole stored history.
async fn run_backtest(
    State(state): State<AppState>,
    Query(query): Query<BacktestQuery>,
) -> Result<Json<ApiResponse<BacktestReport>>> {
    let limit = query.limit.unwrap_or(state.config.backtest_window);
    if limit == 0 {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }
    if limit > state.config.backtest_window {
        return Err(AppError::BadRequest(format!(
            "limit must be at most {}",
            state.config.backtest_window
        )));
    }

    let bundle = state.models.current().await?;
    let candles = state.store.latest_candles(&state.config.asset, limit)?;
    let steps = bundle.decide(&candles)?;

    let backtester = Backtester::new(query.balance.unwrap_or(state.config.initial_balance));
    let report = backtester.run(&steps)?;

    Ok(Json(ApiResponse::new(report)))
}
