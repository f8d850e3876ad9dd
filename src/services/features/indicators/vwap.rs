//! Volume Weighted Average Price (VWAP) indicator.

use crate::services::features::Indicator;
use crate::types::Candle;

/// Rolling VWAP over `period` candles:
/// VWAP = Sum(TP * Volume) / Sum(Volume)
pub struct Vwap {
    period: usize,
}

impl Default for Vwap {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Indicator for Vwap {
    fn id(&self) -> &str {
        "vwap"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("vwap_{}", self.period)]
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
            let mut cum_tp_vol = 0.0;
            let mut cum_vol = 0.0;
            for candle in &candles[(i + 1 - self.period)..=i] {
                cum_tp_vol += candle.typical_price() * candle.volume;
                cum_vol += candle.volume;
            }
            out[i] = Some(if cum_vol > 0.0 {
                cum_tp_vol / cum_vol
            } else {
                candles[i].close
            });
        }

        vec![out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vwap_weights_by_volume() {
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| Candle {
                open_time: i,
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 1.0,
            })
            .collect();
        candles[19] = Candle {
            open_time: 19,
            open: 20.0,
            high: 20.0,
            low: 20.0,
            close: 20.0,
            volume: 19.0,
        };
        let series = Vwap::default().compute(&candles);
        // (19 * 10 + 19 * 20) / 38
        assert!((series[0][19].unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_vwap_without_volume_falls_back_to_close() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| Candle {
                open_time: i,
                open: 3.0,
                high: 4.0,
                low: 2.0,
                close: 3.5,
                volume: 0.0,
            })
            .collect();
        let series = Vwap::default().compute(&candles);
        assert_eq!(series[0][19], Some(3.5));
    }
}
