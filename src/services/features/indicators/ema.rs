//! Exponential Moving Average (EMA) indicator.

use super::{closes, ema_series};
use crate::services::features::Indicator;
use crate::types::Candle;

/// EMA (Exponential Moving Average) of closing prices.
///
/// Like SMA but gives more weight to recent prices.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Ema {
    fn id(&self) -> &str {
        "ema"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("ema_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        vec![ema_series(&closes(candles), self.period)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_tracks_uptrend_below_price() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    open_time: i as i64,
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1.0,
                }
            })
            .collect();
        let ema = Ema::new(12).compute(&candles);
        let last = ema[0][39].unwrap();
        assert!(last < 139.0 && last > 120.0);
    }
}
