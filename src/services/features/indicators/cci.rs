//! Commodity Channel Index (CCI) indicator.

use crate::services::features::Indicator;
use crate::types::Candle;

/// CCI (Commodity Channel Index) indicator.
///
/// CCI = (Typical Price - SMA of TP) / (0.015 * Mean Deviation)
pub struct Cci {
    period: usize,
}

impl Default for Cci {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Cci {
    fn mean_deviation(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().map(|v| (v - mean).abs()).sum::<f64>() / values.len() as f64
    }
}

impl Indicator for Cci {
    fn id(&self) -> &str {
        "cci"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("cci_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut out = vec![None; candles.len()];
        if candles.len() < self.period {
            return vec![out];
        }

        for i in (self.period - 1)..candles.len() {
            let typical_prices: Vec<f64> = candles[(i + 1 - self.period)..=i]
                .iter()
                .map(Candle::typical_price)
                .collect();
            let sma = typical_prices.iter().sum::<f64>() / self.period as f64;
            let mean_dev = Self::mean_deviation(&typical_prices, sma);

            out[i] = Some(if mean_dev != 0.0 {
                (candles[i].typical_price() - sma) / (0.015 * mean_dev)
            } else {
                0.0
            });
        }

        vec![out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cci_positive_after_jump() {
        let mut candles: Vec<Candle> = (0..25)
            .map(|i| Candle {
                open_time: i,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0 + (i % 3) as f64 * 0.1,
                volume: 1.0,
            })
            .collect();
        candles[24].high = 111.0;
        candles[24].close = 110.0;
        let series = Cci::default().compute(&candles);
        assert!(series[0][24].unwrap() > 100.0);
    }
}
