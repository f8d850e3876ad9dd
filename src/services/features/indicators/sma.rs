//! Simple Moving Average (SMA) indicator.

use super::{closes, sma_series};
use crate::services::features::Indicator;
use crate::types::Candle;

/// SMA (Simple Moving Average) of closing prices.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Sma {
    fn id(&self) -> &str {
        "sma"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("sma_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        vec![sma_series(&closes(candles), self.period)]
    }
}
