//! Money Flow Index (MFI) indicator.

use crate::services::features::Indicator;
use crate::types::Candle;

/// MFI (Money Flow Index) indicator.
///
/// Volume-weighted RSI over typical prices, 0-100.
pub struct Mfi {
    period: usize,
}

impl Default for Mfi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Mfi {
    fn mfi(positive_flow: f64, negative_flow: f64) -> f64 {
        if positive_flow == 0.0 && negative_flow == 0.0 {
            50.0
        } else if negative_flow == 0.0 {
            100.0
        } else {
            let money_flow_ratio = positive_flow / negative_flow;
            100.0 - (100.0 / (1.0 + money_flow_ratio))
        }
    }
}

impl Indicator for Mfi {
    fn id(&self) -> &str {
        "mfi"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("mfi_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut out = vec![None; candles.len()];
        if candles.len() < self.min_periods() {
            return vec![out];
        }

        // Signed money flow per candle (index 0 has no predecessor)
        let mut positive = vec![0.0; candles.len()];
        let mut negative = vec![0.0; candles.len()];
        for i in 1..candles.len() {
            let current_tp = candles[i].typical_price();
            let prev_tp = candles[i - 1].typical_price();
            let money_flow = current_tp * candles[i].volume;
            if current_tp > prev_tp {
                positive[i] = money_flow;
            } else if current_tp < prev_tp {
                negative[i] = money_flow;
            }
        }

        for i in self.period..candles.len() {
            let window = (i + 1 - self.period)..=i;
            let positive_flow: f64 = positive[window.clone()].iter().sum();
            let negative_flow: f64 = negative[window].iter().sum();
            out[i] = Some(Self::mfi(positive_flow, negative_flow));
        }

        vec![out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_candles(step: f64) -> Vec<Candle> {
        (0..30)
            .map(|i| {
                let close = 100.0 + i as f64 * step;
                Candle {
                    open_time: i,
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 500.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_mfi_uptrend_is_maximal() {
        let series = Mfi::default().compute(&create_candles(1.0));
        assert_eq!(series[0][13], None);
        assert_eq!(series[0][14], Some(100.0));
    }

    #[test]
    fn test_mfi_downtrend_is_minimal() {
        let series = Mfi::default().compute(&create_candles(-1.0));
        assert_eq!(series[0][29], Some(0.0));
    }

    #[test]
    fn test_mfi_flat_is_neutral() {
        let series = Mfi::default().compute(&create_candles(0.0));
        assert_eq!(series[0][29], Some(50.0));
    }
}
