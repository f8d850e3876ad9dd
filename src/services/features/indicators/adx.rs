//! Average Directional Index (ADX) indicator.

use super::{lagged, true_range, wilder_series};
use crate::services::features::Indicator;
use crate::types::Candle;

/// ADX (Average Directional Index) indicator.
///
/// Measures trend strength (not direction):
/// - Below 20: Weak trend / ranging market
/// - 20-40: Trending
/// - Above 40: Strong trend
///
/// Emitted together with +DI and -DI for direction.
pub struct Adx {
    period: usize,
}

impl Default for Adx {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Indicator for Adx {
    fn id(&self) -> &str {
        "adx"
    }

    fn columns(&self) -> Vec<String> {
        vec![
            format!("adx_{}", self.period),
            "plus_di".to_string(),
            "minus_di".to_string(),
        ]
    }

    fn min_periods(&self) -> usize {
        self.period * 2
    }

    fn compute(&self, candles: &[Candle]) -> Vec<Vec<Option<f64>>> {
        let n = candles.len();
        if n < 2 {
            return vec![vec![None; n]; 3];
        }

        let mut plus_dm = Vec::with_capacity(n - 1);
        let mut minus_dm = Vec::with_capacity(n - 1);
        let mut tr = Vec::with_capacity(n - 1);

        for w in candles.windows(2) {
            let (previous, current) = (&w[0], &w[1]);
            let up_move = current.high - previous.high;
            let down_move = previous.low - current.low;

            plus_dm.push(if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            });
            minus_dm.push(if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            });
            tr.push(true_range(current, previous));
        }

        // Smoothed series are indexed from candle 1
        let smoothed_plus_dm = wilder_series(&plus_dm, self.period);
        let smoothed_minus_dm = wilder_series(&minus_dm, self.period);
        let smoothed_tr = wilder_series(&tr, self.period);

        let mut plus_di = vec![None; n - 1];
        let mut minus_di = vec![None; n - 1];
        let mut dx_values = Vec::new();
        for i in 0..(n - 1) {
            let (Some(atr), Some(pdm), Some(mdm)) =
                (smoothed_tr[i], smoothed_plus_dm[i], smoothed_minus_dm[i])
            else {
                continue;
            };
            let (pdi, mdi) = if atr > 0.0 {
                (pdm / atr * 100.0, mdm / atr * 100.0)
            } else {
                (0.0, 0.0)
            };
            plus_di[i] = Some(pdi);
            minus_di[i] = Some(mdi);

            let di_sum = pdi + mdi;
            dx_values.push(if di_sum > 0.0 {
                (pdi - mdi).abs() / di_sum * 100.0
            } else {
                0.0
            });
        }

        // DX starts at candle `period`; ADX smooths it once more
        let mut adx = lagged(wilder_series(&dx_values, self.period), self.period);
        adx.resize(n, None);

        vec![adx, lagged(plus_di, 1), lagged(minus_di, 1)]
    }
}
