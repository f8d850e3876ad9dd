//! Stochastic Oscillator indicator.

use super::{lagged, sma_series};
use crate::services::features::Indicator;
use crate::types::Candle;

/// Stochastic Oscillator.
///
/// %K = (close - lowest low) / (highest high - lowest low) * 100
/// %D = SMA of %K
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

impl Indicator for Stochastic {
    fn id(&self) -> &str {
        "stochastic"
    }

    fn columns(&self) -> Vec<String> {
        vec!["stoch_k".to_string(), "stoch_d".to_string()]
    }

    fn min_periods(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut k_line = vec![None; candles.len()];
        if candles.len() < self.k_period {
            return vec![k_line.clone(), k_line];
        }

        for i in (self.k_period - 1)..candles.len() {
            let window = &candles[(i + 1 - self.k_period)..=i];
            let lowest_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let highest_high = window
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);

            k_line[i] = Some(if highest_high != lowest_low {
                ((candles[i].close - lowest_low) / (highest_high - lowest_low)) * 100.0
            } else {
                50.0
            });
        }

        let start = self.k_period - 1;
        let defined: Vec<f64> = k_line[start..].iter().flatten().copied().collect();
        let d_line = lagged(sma_series(&defined, self.d_period), start);

        vec![k_line, d_line]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: i as i64,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_stochastic_min_periods() {
        assert_eq!(Stochastic::default().min_periods(), 16);
    }

    #[test]
    fn test_stochastic_high_at_top_of_range() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = Stochastic::default().compute(&create_candles(&closes));
        let k = series[0][29].unwrap();
        assert!(k > 80.0, "expected overbought %K, got {}", k);
        assert!(series[1][15].is_some());
        assert!(series[1][14].is_none());
    }

    #[test]
    fn test_stochastic_flat_range_is_neutral() {
        let closes = vec![100.0; 20];
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                open_time: i as i64,
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
            })
            .collect();
        let series = Stochastic::default().compute(&candles);
        assert_eq!(series[0][19], Some(50.0));
        assert_eq!(series[1][19], Some(50.0));
    }
}
