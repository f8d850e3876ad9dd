//! Bollinger Bands indicator.

use crate::services::features::Indicator;
use crate::types::Candle;

/// Bollinger Bands indicator.
///
/// Emits %B (price position within the bands, as a percentage) and the band
/// width relative to the middle band.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    /// Population standard deviation.
    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

impl Indicator for BollingerBands {
    fn id(&self) -> &str {
        "bollinger"
    }

    fn columns(&self) -> Vec<String> {
        vec!["bb_percent_b".to_string(), "bb_width".to_string()]
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut percent_b = vec![None; candles.len()];
        let mut width = vec![None; candles.len()];
        if candles.len() < self.period {
            return vec![percent_b, width];
        }

        for i in (self.period - 1)..candles.len() {
            let closes: Vec<f64> = candles[(i + 1 - self.period)..=i]
                .iter()
                .map(|c| c.close)
                .collect();
            let middle = closes.iter().sum::<f64>() / self.period as f64;
            let std_dev = Self::std_dev(&closes, middle);
            let upper = middle + self.std_dev_multiplier * std_dev;
            let lower = middle - self.std_dev_multiplier * std_dev;
            let band_width = upper - lower;

            let pb = if band_width > 0.0 {
                (candles[i].close - lower) / band_width
            } else {
                0.5
            };
            percent_b[i] = Some(pb * 100.0);
            width[i] = Some(if middle != 0.0 {
                band_width / middle * 100.0
            } else {
                0.0
            });
        }

        vec![percent_b, width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_prices_sit_mid_band() {
        let candles: Vec<Candle> = (0..25)
            .map(|i| Candle {
                open_time: i,
                open: 50.0,
                high: 50.0,
                low: 50.0,
                close: 50.0,
                volume: 1.0,
            })
            .collect();
        let series = BollingerBands::default().compute(&candles);
        assert_eq!(series[0][24], Some(50.0));
        assert_eq!(series[1][24], Some(0.0));
        assert_eq!(series[0][18], None);
    }

    #[test]
    fn test_breakout_above_upper_band() {
        let mut candles: Vec<Candle> = (0..25)
            .map(|i| {
                let close = 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 };
                Candle {
                    open_time: i,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1.0,
                }
            })
            .collect();
        candles[24].close = 120.0;
        let series = BollingerBands::default().compute(&candles);
        assert!(series[0][24].unwrap() > 100.0);
    }
}
