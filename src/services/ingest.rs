//! Binance kline ingestion.
//!
//! Pages through `GET /api/v3/klines` from a start time until now and
//! upserts every page into the candle store.

use crate::services::{CandleStore, StoreError};
use crate::types::Candle;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Maximum klines per request accepted by Binance.
pub const PAGE_LIMIT: usize = 1000;

/// Ingestion errors.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Binance API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Malformed kline: {0}")]
    Malformed(String),
    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Kline interval length in milliseconds.
pub fn interval_millis(interval: &str) -> Option<i64> {
    const MINUTE: i64 = 60_000;
    let millis = match interval {
        "1m" => MINUTE,
        "3m" => 3 * MINUTE,
        "5m" => 5 * MINUTE,
        "15m" => 15 * MINUTE,
        "30m" => 30 * MINUTE,
        "1h" => 60 * MINUTE,
        "2h" => 120 * MINUTE,
        "4h" => 240 * MINUTE,
        "6h" => 360 * MINUTE,
        "8h" => 480 * MINUTE,
        "12h" => 720 * MINUTE,
        "1d" => 1440 * MINUTE,
        "3d" => 3 * 1440 * MINUTE,
        "1w" => 7 * 1440 * MINUTE,
        _ => return None,
    };
    Some(millis)
}

/// Parse one kline row: `[open_time, "open", "high", "low", "close", "volume", ...]`.
pub fn parse_kline(row: &Value) -> Result<Candle, IngestError> {
    let fields = row
        .as_array()
        .ok_or_else(|| IngestError::Malformed(format!("expected array, got {}", row)))?;
    if fields.len() < 6 {
        return Err(IngestError::Malformed(format!(
            "expected at least 6 fields, got {}",
            fields.len()
        )));
    }

    let open_time = fields[0]
        .as_i64()
        .ok_or_else(|| IngestError::Malformed(format!("bad open time {}", fields[0])))?;
    let number = |index: usize| -> Result<f64, IngestError> {
        let value = &fields[index];
        let parsed = match value {
            Value::String(s) => s.parse::<f64>().ok(),
            other => other.as_f64(),
        };
        parsed.ok_or_else(|| IngestError::Malformed(format!("bad number {}", value)))
    };

    Ok(Candle {
        open_time,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
    })
}

/// Binance public kline client.
#[derive(Clone)]
pub struct BinanceKlines {
    client: Client,
    base_url: String,
}

impl BinanceKlines {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent("Ridgeline/1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch up to `limit` klines starting at `start_time`.
    pub async fn fetch_page(
        &self,
        symbol: &str,
        interval: &str,
        start_time: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, IngestError> {
        let url = format!("{}/klines", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.to_string()),
                ("interval", interval.to_string()),
                ("startTime", start_time.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                "Binance API returned {}: {}",
                status,
                truncate_body(&text, 200)
            );
            return Err(IngestError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let rows: Vec<Value> = response.json().await?;
        rows.iter().map(parse_kline).collect()
    }

    /// Fetch every kline from `start_time` until now into the store.
    /// Returns the number of candles written.
    pub async fn backfill(
        &self,
        store: &CandleStore,
        symbol: &str,
        interval: &str,
        start_time: i64,
    ) -> Result<usize, IngestError> {
        let step = interval_millis(interval)
            .ok_or_else(|| IngestError::UnsupportedInterval(interval.to_string()))?;
        let now = chrono::Utc::now().timestamp_millis();

        info!("Backfilling {} {} klines from {}", symbol, interval, start_time);

        let mut cursor = start_time;
        let mut written = 0;
        while cursor < now {
            let page = self.fetch_page(symbol, interval, cursor, PAGE_LIMIT).await?;
            let Some(last) = page.last() else {
                break;
            };
            let next = last.open_time + step;

            written += store.upsert_candles(symbol, &page)?;
            debug!("Stored {} klines up to {}", page.len(), last.open_time);

            if page.len() < PAGE_LIMIT || next <= cursor {
                break;
            }
            cursor = next;
        }

        info!("Backfill of {} complete: {} candles", symbol, written);
        Ok(written)
    }
}

/// First `max_chars` characters of a response body, for logging.
fn truncate_body(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
