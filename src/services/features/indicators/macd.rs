//! MACD (Moving Average Convergence Divergence) indicator.

use super::{closes, ema_series, lagged};
use crate::services::features::Indicator;
use crate::types::Candle;

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Indicator for Macd {
    fn id(&self) -> &str {
        "macd"
    }

    fn columns(&self) -> Vec<String> {
        vec![
            "macd".to_string(),
            "macd_signal".to_string(),
            "macd_hist".to_string(),
        ]
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let closes = closes(candles);
        let fast = ema_series(&closes, self.fast_period);
        let slow = ema_series(&closes, self.slow_period);

        let macd_line: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();

        // Signal line runs over the defined part of the MACD line only
        let start = self.slow_period.saturating_sub(1).min(candles.len());
        let defined: Vec<f64> = macd_line[start..].iter().flatten().copied().collect();
        let signal_line = lagged(ema_series(&defined, self.signal_period), start);

        let histogram: Vec<Option<f64>> = macd_line
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| Some((*m)? - (*s)?))
            .collect();

        vec![macd_line, signal_line, histogram]
    }
}
