//! Average True Range (ATR) indicator.

use super::{lagged, true_range, wilder_series};
use crate::services::features::Indicator;
use crate::types::Candle;

/// ATR (Average True Range) indicator, expressed as a percentage of price.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Indicator for Atr {
    fn id(&self) -> &str {
        "atr"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("atr_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        if candles.len() < 2 {
            return vec![vec![None; candles.len()]];
        }

        let true_ranges: Vec<f64> = candles
            .windows(2)
            .map(|w| true_range(&w[1], &w[0]))
            .collect();
        let atr = lagged(wilder_series(&true_ranges, self.period), 1);

        let atr_pct = atr
            .iter()
            .zip(candles)
            .map(|(atr, candle)| {
                let atr = (*atr)?;
                Some(if candle.close != 0.0 {
                    atr / candle.close * 100.0
                } else {
                    0.0
                })
            })
            .collect();

        vec![atr_pct]
    }
}
