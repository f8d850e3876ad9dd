//! End-to-end training, persistence and replay

mod common;

use ridgeline::services::{Backtester, CandleStore, FeatureDeriver, ModelBundle};
use ridgeline::types::Decision;

#[test]
fn test_train_save_load_reproduces_probabilities() {
    let candles = common::wave_candles(300);
    let outcome = common::quick_training(&candles);

    let manifest = &outcome.bundle.manifest;
    assert_eq!(manifest.feature_columns, FeatureDeriver::default().columns());
    assert_eq!(manifest.hidden_layers, vec![40, 20, 10]);
    assert_eq!(manifest.losses.len(), 3);
    assert_eq!(manifest.train_rows + manifest.validation_rows, 300 - 33);
    assert_eq!(outcome.bundle.cutoffs.len(), 3);
    assert_eq!(outcome.calibrations.len(), 3);
    assert_eq!(outcome.label_counts.iter().sum::<usize>(), 300 - 33);

    let dir = tempfile::tempdir().unwrap();
    outcome.bundle.save(dir.path()).unwrap();
    for file in ["model.safetensors", "manifest.json", "cutoffs.json"] {
        assert!(dir.path().join(file).exists(), "{}", file);
    }

    let loaded = ModelBundle::load(dir.path()).unwrap();
    assert_eq!(loaded.cutoffs, outcome.bundle.cutoffs);

    let table = FeatureDeriver::default().derive(&candles).unwrap();
    let before = outcome.bundle.probabilities(&table.matrix()).unwrap();
    let after = loaded.probabilities(&table.matrix()).unwrap();
    assert_eq!(before, after);

    assert_eq!(
        outcome.bundle.decide(&candles).unwrap(),
        loaded.decide(&candles).unwrap()
    );
}

#[test]
fn test_decisions_replay_through_backtester() {
    let candles = common::wave_candles(300);
    let store = CandleStore::new_in_memory().unwrap();
    store.upsert_candles("BTCUSDT", &candles).unwrap();

    let outcome = common::quick_training(&candles);
    let history = store.latest_candles("BTCUSDT", 120).unwrap();
    let steps = outcome.bundle.decide(&history).unwrap();
    assert_eq!(steps.len(), 120 - 33);
    assert_eq!(steps[0].time, history[33].open_time);
    assert_eq!(steps[0].price, history[33].close);

    let report = Backtester::new(1000.0).run(&steps).unwrap();
    assert_eq!(report.trajectory.len(), steps.len());

    let prediction = outcome.bundle.predict_latest(&history).unwrap();
    assert_eq!(prediction.open_time, history[119].open_time);
    assert!((prediction.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-4);
}

#[test]
fn test_hold_only_replay_keeps_balance() {
    let candles = common::wave_candles(120);
    let steps: Vec<_> = candles
        .iter()
        .map(|c| ridgeline::types::BacktestStep::new(c.open_time, Decision::Hold, c.close))
        .collect();
    let report = Backtester::new(1000.0).run(&steps).unwrap();
    assert_eq!(report.final_balance, 1000.0);
}
