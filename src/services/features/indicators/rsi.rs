//! Relative Strength Index (RSI) indicator.

use crate::services::features::Indicator;
use crate::types::Candle;

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    fn rsi(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

impl Indicator for Rsi {
    fn id(&self) -> &str {
        "rsi"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("rsi_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut out = vec![None; candles.len()];
        if candles.len() < self.min_periods() {
            return vec![out];
        }

        let mut gains = Vec::with_capacity(candles.len() - 1);
        let mut losses = Vec::with_capacity(candles.len() - 1);
        for i in 1..candles.len() {
            let change = candles[i].close - candles[i - 1].close;
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        // Initial averages, then Wilder smoothing
        let period = self.period as f64;
        let mut avg_gain = gains.iter().take(self.period).sum::<f64>() / period;
        let mut avg_loss = losses.iter().take(self.period).sum::<f64>() / period;
        out[self.period] = Some(Self::rsi(avg_gain, avg_loss));

        for i in self.period..gains.len() {
            avg_gain = (avg_gain * (period - 1.0) + gains[i]) / period;
            avg_loss = (avg_loss * (period - 1.0) + losses[i]) / period;
            out[i + 1] = Some(Self::rsi(avg_gain, avg_loss));
        }

        vec![out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_candles(count: usize, step: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * step;
                Candle {
                    open_time: 1000000 + i as i64 * 60000,
                    open: base,
                    high: base + 2.0,
                    low: base - 2.0,
                    close: base + 1.0,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_rsi_min_periods() {
        assert_eq!(Rsi::default().min_periods(), 15);
        assert_eq!(Rsi::new(7).min_periods(), 8);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let series = Rsi::default().compute(&create_candles(10, 1.5));
        assert!(series[0].iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_rsi_uptrend_is_maximal() {
        let series = Rsi::default().compute(&create_candles(50, 1.5));
        assert_eq!(series[0][14], Some(100.0));
        assert_eq!(series[0][49], Some(100.0));
    }

    #[test]
    fn test_rsi_downtrend_low_value() {
        let series = Rsi::default().compute(&create_candles(50, -1.5));
        let value = series[0][49].unwrap();
        assert!(value < 50.0, "RSI in downtrend should be < 50, got {}", value);
    }

    #[test]
    fn test_rsi_value_range() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let close = 100.0 + 5.0 * (i as f64 / 4.0).sin();
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
        let series = Rsi::default().compute(&candles);
        for value in series[0].iter().flatten() {
            assert!((0.0..=100.0).contains(value));
        }
    }
}
