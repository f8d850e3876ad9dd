//! Shared fixtures for integration tests.

#![allow(dead_code)]

use ridgeline::services::{SignalLabeler, Trainer, TrainingConfig, TrainingOutcome};
use ridgeline::types::Candle;

/// Five-minute candles following a drifting sine wave.
pub fn wave_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + 10.0 * (t / 6.0).sin() + t * 0.05;
            Candle {
                open_time: 1_700_000_000_000 + i as i64 * 300_000,
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0 + 50.0 * (t / 3.0).cos(),
            }
        })
        .collect()
}

/// A few epochs on the wave, enough for a usable bundle.
pub fn quick_training(candles: &[Candle]) -> TrainingOutcome {
    let config = TrainingConfig {
        epochs: 3,
        batch_size: 32,
        ..Default::default()
    };
    let labeler = SignalLabeler::default().with_distance(5);
    Trainer::new(config, labeler)
        .train("BTCUSDT", candles)
        .expect("training on the wave succeeds")
}
