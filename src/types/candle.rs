use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle for one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Bucket open time (ms since epoch).
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Typical price: (high + low + close) / 3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Open time as a UTC datetime.
    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }
}

/// Derived indicator values for a single candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    pub open_time: i64,
    pub close: f64,
    pub values: Vec<f64>,
}

/// Wide indicator table, one row per candle with a complete trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTable {
    /// Column names, index-aligned with every row's values.
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
    /// Index of the first row within the source candle slice.
    pub offset: usize,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of feature columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Close prices aligned with the rows.
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    /// Feature values as a row-major matrix.
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values.clone()).collect()
    }

    /// Last row, if any.
    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }
}
