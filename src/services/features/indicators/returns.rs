//! One-step close-to-close return.

use crate::services::features::Indicator;
use crate::types::Candle;

/// Fractional change of the close over `period` candles.
pub struct Returns {
    period: usize,
}

impl Default for Returns {
    fn default() -> Self {
        Self { period: 1 }
    }
}

impl Returns {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }
}

impl Indicator for Returns {
    fn id(&self) -> &str {
        "return"
    }

    fn columns(&self) -> Vec<String> {
        vec![format!("return_{}", self.period)]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let mut out = vec![None; candles.len()];
        for i in self.period..candles.len() {
            let previous = candles[i - self.period].close;
            out[i] = Some(if previous != 0.0 {
                candles[i].close / previous - 1.0
            } else {
                0.0
            });
        }
        vec![out]
    }
}
