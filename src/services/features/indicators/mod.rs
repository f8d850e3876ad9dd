//! Rolling technical indicator implementations.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod vwap;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use cci::Cci;
pub use ema::Ema;
pub use macd::Macd;
pub use mfi::Mfi;
pub use obv::Obv;
pub use returns::Returns;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::Stochastic;
pub use vwap::Vwap;

use super::Indicator;
use crate::types::Candle;

/// The default feature set, in column order.
pub fn all_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Returns::default()),
        // Trend
        Box::new(Sma::new(20)),
        Box::new(Ema::new(12)),
        Box::new(Ema::new(26)),
        Box::new(Macd::default()),
        // Momentum
        Box::new(Rsi::default()),
        Box::new(Stochastic::default()),
        // Volatility
        Box::new(BollingerBands::default()),
        Box::new(Atr::default()),
        Box::new(Cci::default()),
        // Volume
        Box::new(Mfi::default()),
        Box::new(Obv),
        Box::new(Vwap::default()),
        // Trend strength
        Box::new(Adx::default()),
    ]
}

/// Simple moving average; defined from index `period - 1`.
pub(crate) fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[(i + 1 - period)..=i];
        out[i] = Some(window.iter().sum::<f64>() / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values; defined from index `period - 1`.
pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = values.iter().take(period).sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);
    for i in period..values.len() {
        ema = (values[i] - ema) * multiplier + ema;
        out[i] = Some(ema);
    }
    out
}

/// Wilder's smoothing seeded with the mean of the first `period` values;
/// defined from index `period - 1`.
pub(crate) fn wilder_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut smoothed = values.iter().take(period).sum::<f64>() / period as f64;
    out[period - 1] = Some(smoothed);
    for i in period..values.len() {
        smoothed = (smoothed * (period - 1) as f64 + values[i]) / period as f64;
        out[i] = Some(smoothed);
    }
    out
}

/// Shift a series computed over `candles[lag..]` back onto candle indices.
pub(crate) fn lagged(series: Vec<Option<f64>>, lag: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; lag];
    out.extend(series);
    out
}

/// True range of a candle against the previous close.
pub(crate) fn true_range(current: &Candle, previous: &Candle) -> f64 {
    let hl = current.high - current.low;
    let hc = (current.high - previous.close).abs();
    let lc = (current.low - previous.close).abs();
    hl.max(hc).max(lc)
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
