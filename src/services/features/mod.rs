//! Feature derivation.
//!
//! Turns an ordered candle slice into a wide indicator table. Every indicator
//! declares how many candles it needs before its first defined value; the
//! table starts at the first row where all of them are defined.

pub mod indicators;

use crate::types::{Candle, FeatureRow, FeatureTable};
use thiserror::Error;
use tracing::debug;

/// Feature derivation errors.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("Insufficient history for feature window: need {required} candles, got {available}")]
    InsufficientHistory { required: usize, available: usize },
    #[error("Invalid value in column {column} at {open_time}")]
    InvalidValue { column: String, open_time: i64 },
}

/// A rolling technical indicator producing one or more feature columns.
pub trait Indicator: Send + Sync {
    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Output column names, in emission order.
    fn columns(&self) -> Vec<String>;

    /// Number of candles needed before every column is defined.
    /// Values at index `min_periods() - 1` and later must be `Some`.
    fn min_periods(&self) -> usize;

    /// One series per column, each as long as `candles`.
    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>>;
}

/// Builds feature tables from a fixed set of indicators.
pub struct FeatureDeriver {
    indicators: Vec<Box<dyn Indicator>>,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::new(indicators::all_indicators())
    }
}

impl FeatureDeriver {
    pub fn new(indicators: Vec<Box<dyn Indicator>>) -> Self {
        Self { indicators }
    }

    /// Column names of the derived table.
    pub fn columns(&self) -> Vec<String> {
        self.indicators.iter().flat_map(|i| i.columns()).collect()
    }

    /// Candles required before the first complete row.
    pub fn warmup(&self) -> usize {
        self.indicators
            .iter()
            .map(|i| i.min_periods())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Derive the feature table for an ascending candle slice.
    pub fn derive(&self, candles: &[Candle]) -> Result<FeatureTable, FeatureError> {
        let warmup = self.warmup();
        if candles.len() < warmup {
            return Err(FeatureError::InsufficientHistory {
                required: warmup,
                available: candles.len(),
            });
        }

        let columns = self.columns();
        let series: Vec<Vec<Option<f64>>> = self
            .indicators
            .iter()
            .flat_map(|i| i.compute(candles))
            .collect();

        let offset = warmup - 1;
        let mut rows = Vec::with_capacity(candles.len() - offset);
        for (index, candle) in candles.iter().enumerate().skip(offset) {
            let mut values = Vec::with_capacity(columns.len());
            for (column, values_for_column) in columns.iter().zip(&series) {
                match values_for_column.get(index).copied().flatten() {
                    Some(v) if v.is_finite() => values.push(v),
                    _ => {
                        return Err(FeatureError::InvalidValue {
                            column: column.clone(),
                            open_time: candle.open_time,
                        })
                    }
                }
            }
            rows.push(FeatureRow {
                open_time: candle.open_time,
                close: candle.close,
                values,
            });
        }

        debug!(
            "Derived {} feature rows x {} columns from {} candles",
            rows.len(),
            columns.len(),
            candles.len()
        );

        Ok(FeatureTable {
            columns,
            rows,
            offset,
        })
    }
}
