//! On-Balance Volume (OBV) indicator.

use crate::services::features::Indicator;
use crate::types::Candle;

/// OBV (On-Balance Volume): cumulative volume signed by close direction.
pub struct Obv;

impl Indicator for Obv {
    fn id(&self) -> &str {
        "obv"
    }

    fn columns(&self) -> Vec<String> {
        vec!["obv".to_string()]
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut out = Vec::with_capacity(candles.len());
        let mut obv = 0.0;
        for (i, candle) in candles.iter().enumerate() {
            if i > 0 {
                let previous = candles[i - 1].close;
                if candle.close > previous {
                    obv += candle.volume;
                } else if candle.close < previous {
                    obv -= candle.volume;
                }
            }
            out.push(Some(obv));
        }
        vec![out]
    }
}
