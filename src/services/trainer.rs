//! Model training.
//!
//! Derives features, labels them by peak/valley detection, splits the rows
//! into train and validation sets, fits a robust scaler on the train rows and
//! trains the classifier with mini-batch AdamW on cross-entropy. Cutoffs are
//! calibrated on the train split's probabilities.

use crate::services::calibration::{self, CalibrationError, ClassCalibration};
use crate::services::classifier::{default_hidden, Classifier, CLASS_COUNT};
use crate::services::decision;
use crate::services::features::{FeatureDeriver, FeatureError};
use crate::services::labeler::SignalLabeler;
use crate::services::model_service::{ModelBundle, ModelManifest};
use crate::services::scaler::RobustScaler;
use crate::types::{Candle, Label};
use candle_core::Tensor;
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Training errors.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Features(#[from] FeatureError),
    #[error("Calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("Model error: {0}")]
    Model(#[from] candle_core::Error),
    #[error("Not enough rows to train: {rows}")]
    NotEnoughRows { rows: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_fraction: f64,
    pub seed: u64,
    /// Hidden layer sizes; `None` uses [`default_hidden`].
    pub hidden: Option<Vec<usize>>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            batch_size: 86,
            validation_fraction: 0.2,
            seed: 44,
            hidden: None,
        }
    }
}

/// Stepped learning-rate schedule.
pub fn learning_rate(epoch: usize) -> f64 {
    if epoch < 10 {
        3e-4
    } else if epoch < 25 {
        1e-4
    } else {
        3e-5
    }
}

/// Shuffled (train, validation) row indices. The validation share is rounded up.
pub fn split_indices(rows: usize, validation_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let validation = ((rows as f64 * validation_fraction).ceil() as usize).min(rows);
    let train = indices.split_off(validation);
    (train, indices)
}

/// Held-out evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub rows: usize,
    pub accuracy: f64,
    /// Row = true class, column = predicted class.
    pub confusion: Vec<Vec<usize>>,
}

pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub calibrations: Vec<ClassCalibration>,
    pub validation: ValidationReport,
    /// Label counts in class-index order.
    pub label_counts: Vec<usize>,
}

pub struct Trainer {
    config: TrainingConfig,
    labeler: SignalLabeler,
    deriver: FeatureDeriver,
}

impl Trainer {
    pub fn new(config: TrainingConfig, labeler: SignalLabeler) -> Self {
        Self {
            config,
            labeler,
            deriver: FeatureDeriver::default(),
        }
    }

    /// Train a bundle on an ascending candle history.
    pub fn train(&self, asset: &str, candles: &[Candle]) -> Result<TrainingOutcome, TrainError> {
        if self.config.batch_size == 0 {
            return Err(TrainError::InvalidConfig("Batch size must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.config.validation_fraction) {
            return Err(TrainError::InvalidConfig(
                "Validation fraction must be in [0, 1)".to_string(),
            ));
        }

        let table = self.deriver.derive(candles)?;
        let labels: Vec<usize> = self
            .labeler
            .label(&table.closes())
            .iter()
            .map(Label::class_index)
            .collect();
        let matrix = table.matrix();

        let mut label_counts = vec![0; CLASS_COUNT];
        for &label in &labels {
            label_counts[label] += 1;
        }
        info!(
            "Training {} on {} rows x {} features (buy {}, hold {}, sell {})",
            asset,
            table.len(),
            table.width(),
            label_counts[0],
            label_counts[1],
            label_counts[2]
        );

        let (train_idx, validation_idx) =
            split_indices(table.len(), self.config.validation_fraction, self.config.seed);
        if train_idx.is_empty() {
            return Err(TrainError::NotEnoughRows { rows: table.len() });
        }

        let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
            idx.iter().map(|&i| (matrix[i].clone(), labels[i])).unzip()
        };
        let (train_rows, train_labels) = gather(&train_idx);
        let (validation_rows, validation_labels) = gather(&validation_idx);

        let scaler = RobustScaler::fit(&train_rows)
            .ok_or(TrainError::NotEnoughRows { rows: train_rows.len() })?;
        let train_scaled = scaler.transform(&train_rows);

        let hidden = self
            .config
            .hidden
            .clone()
            .unwrap_or_else(|| default_hidden(table.width()));
        let classifier = Classifier::new(table.width(), &hidden, CLASS_COUNT)?;
        let losses = self.fit(&classifier, &train_scaled, &train_labels)?;

        // Cutoffs come from the train split
        let train_probs = classifier.predict_proba(&train_scaled)?;
        let calibration = calibration::calibrate(&train_labels, &train_probs, CLASS_COUNT)?;

        let validation_probs = classifier.predict_proba(&scaler.transform(&validation_rows))?;
        let predicted: Vec<usize> = decision::reduce_all(&validation_probs, &calibration.cutoffs)
            .iter()
            .map(|d| d.as_label().class_index())
            .collect();
        let correct = predicted
            .iter()
            .zip(&validation_labels)
            .filter(|(p, l)| p == l)
            .count();
        let validation = ValidationReport {
            rows: validation_labels.len(),
            accuracy: if validation_labels.is_empty() {
                0.0
            } else {
                correct as f64 / validation_labels.len() as f64
            },
            confusion: calibration::confusion_matrix(&validation_labels, &predicted, CLASS_COUNT),
        };
        info!(
            "Validation accuracy {:.3} over {} rows, cutoffs {:?}",
            validation.accuracy,
            validation.rows,
            calibration.cutoffs.as_slice()
        );

        let manifest = ModelManifest {
            asset: asset.to_string(),
            feature_columns: table.columns.clone(),
            hidden_layers: hidden,
            class_count: CLASS_COUNT,
            scaler,
            trained_at: chrono::Utc::now().timestamp_millis(),
            epochs: self.config.epochs,
            train_rows: train_rows.len(),
            validation_rows: validation_rows.len(),
            losses,
        };

        Ok(TrainingOutcome {
            bundle: ModelBundle::new(manifest, classifier, calibration.cutoffs),
            calibrations: calibration.classes,
            validation,
            label_counts,
        })
    }

    /// Mini-batch training loop. Returns the mean loss per epoch.
    fn fit(
        &self,
        classifier: &Classifier,
        rows: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<Vec<f64>, TrainError> {
        let mut optimizer = AdamW::new(
            classifier.var_map().all_vars(),
            ParamsAdamW {
                lr: learning_rate(0),
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut losses = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            optimizer.set_learning_rate(learning_rate(epoch));
            order.shuffle(&mut rng);

            let mut total = 0.0;
            let mut batches = 0;
            for chunk in order.chunks(self.config.batch_size) {
                let batch_rows: Vec<Vec<f64>> = chunk.iter().map(|&i| rows[i].clone()).collect();
                let batch_labels: Vec<u32> = chunk.iter().map(|&i| labels[i] as u32).collect();

                let inputs = classifier.to_tensor(&batch_rows)?;
                let targets = Tensor::from_vec(batch_labels, chunk.len(), inputs.device())?;
                let logits = classifier.forward(&inputs)?;
                let batch_loss = loss::cross_entropy(&logits, &targets)?;
                optimizer.backward_step(&batch_loss)?;

                total += f64::from(batch_loss.to_scalar::<f32>()?);
                batches += 1;
            }

            let mean = if batches > 0 { total / batches as f64 } else { 0.0 };
            losses.push(mean);
            if epoch % 10 == 0 || epoch + 1 == self.config.epochs {
                debug!("Epoch {}/{}: loss {:.5}", epoch + 1, self.config.epochs, mean);
            }
        }

        Ok(losses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_rate_schedule() {
        assert_eq!(learning_rate(0), 3e-4);
        assert_eq!(learning_rate(9), 3e-4);
        assert_eq!(learning_rate(10), 1e-4);
        assert_eq!(learning_rate(24), 1e-4);
        assert_eq!(learning_rate(25), 3e-5);
        assert_eq!(learning_rate(199), 3e-5);
    }

    #[test]
    fn test_split_is_deterministic_and_disjoint() {
        let (train, validation) = split_indices(101, 0.2, 44);
        assert_eq!(validation.len(), 21);
        assert_eq!(train.len(), 80);

        let mut all: Vec<usize> = train.iter().chain(&validation).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());

        assert_eq!(split_indices(101, 0.2, 44), (train, validation));
        assert_ne!(split_indices(101, 0.2, 45).1, split_indices(101, 0.2, 44).1);
    }

    #[test]
    fn test_invalid_config() {
        let config = TrainingConfig {
            batch_size: 0,
            ..Default::default()
        };
        let trainer = Trainer::new(config, SignalLabeler::default());
        assert!(matches!(
            trainer.train("BTCUSDT", &[]),
            Err(TrainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_short_history_is_reported() {
        let trainer = Trainer::new(TrainingConfig::default(), SignalLabeler::default());
        let candles = crate::services::features::tests::wave_candles(10);
        assert!(matches!(
            trainer.train("BTCUSDT", &candles),
            Err(TrainError::Features(FeatureError::InsufficientHistory { .. }))
        ));
    }
}
