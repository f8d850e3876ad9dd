//! Model bundle persistence and the server-side model context.
//!
//! A bundle directory holds:
//! - `model.safetensors`: classifier weights
//! - `manifest.json`: feature columns, topology, scaler and training metadata
//! - `cutoffs.json`: one probability cutoff per class, as a bare JSON array

use crate::services::classifier::Classifier;
use crate::services::decision;
use crate::services::features::{FeatureDeriver, FeatureError};
use crate::services::scaler::RobustScaler;
use crate::types::{BacktestStep, Candle, CutoffSet, FeatureTable, ModelStatus, Prediction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CUTOFFS_FILE: &str = "cutoffs.json";

/// Model errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model not loaded. Please load the model first.")]
    NotLoaded,
    #[error("Cutoff file {path} unreadable: {reason}")]
    CutoffUnreadable { path: String, reason: String },
    #[error("Manifest {path} unreadable: {reason}")]
    ManifestUnreadable { path: String, reason: String },
    #[error("Model weights error: {0}")]
    Weights(#[from] candle_core::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Feature mismatch: model expects {expected:?}, deriver produces {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Expected {expected} cutoffs, found {found}")]
    CutoffCount { expected: usize, found: usize },
    #[error(transparent)]
    Features(#[from] FeatureError),
}

/// Everything besides weights and cutoffs needed to rebuild a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    pub asset: String,
    pub feature_columns: Vec<String>,
    pub hidden_layers: Vec<usize>,
    pub class_count: usize,
    pub scaler: RobustScaler,
    /// Training completion time (ms since epoch).
    pub trained_at: i64,
    pub epochs: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    /// Mean training loss per epoch.
    #[serde(default)]
    pub losses: Vec<f64>,
}

/// Read a cutoff file.
pub fn read_cutoffs(path: &Path) -> Result<CutoffSet, ModelError> {
    let unreadable = |reason: String| ModelError::CutoffUnreadable {
        path: path.display().to_string(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))
}

/// Write a cutoff file.
pub fn write_cutoffs(path: &Path, cutoffs: &CutoffSet) -> Result<(), ModelError> {
    fs::write(path, serde_json::to_string(cutoffs)?)?;
    Ok(())
}

/// A trained classifier with its scaler and cutoffs.
pub struct ModelBundle {
    pub manifest: ModelManifest,
    pub cutoffs: CutoffSet,
    classifier: Classifier,
    deriver: FeatureDeriver,
}

impl ModelBundle {
    pub fn new(manifest: ModelManifest, classifier: Classifier, cutoffs: CutoffSet) -> Self {
        Self {
            manifest,
            cutoffs,
            classifier,
            deriver: FeatureDeriver::default(),
        }
    }

    /// Load a bundle directory.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: ModelManifest = fs::read_to_string(&manifest_path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
            .map_err(|reason| ModelError::ManifestUnreadable {
                path: manifest_path.display().to_string(),
                reason,
            })?;

        let deriver = FeatureDeriver::default();
        let columns = deriver.columns();
        if columns != manifest.feature_columns {
            return Err(ModelError::FeatureMismatch {
                expected: manifest.feature_columns,
                found: columns,
            });
        }

        let cutoffs = read_cutoffs(&dir.join(CUTOFFS_FILE))?;
        if cutoffs.len() != manifest.class_count {
            return Err(ModelError::CutoffCount {
                expected: manifest.class_count,
                found: cutoffs.len(),
            });
        }

        let classifier = Classifier::load(
            dir.join(WEIGHTS_FILE),
            manifest.feature_columns.len(),
            &manifest.hidden_layers,
            manifest.class_count,
        )?;

        info!(
            "Loaded model for {} from {} ({} features, cutoffs {:?})",
            manifest.asset,
            dir.display(),
            manifest.feature_columns.len(),
            cutoffs.as_slice()
        );

        Ok(Self {
            manifest,
            cutoffs,
            classifier,
            deriver,
        })
    }

    /// Write the bundle: directory, then weights, manifest, cutoffs.
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        fs::create_dir_all(dir)?;
        self.classifier.save(dir.join(WEIGHTS_FILE))?;
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&self.manifest)?,
        )?;
        write_cutoffs(&dir.join(CUTOFFS_FILE), &self.cutoffs)?;
        info!("Saved model bundle to {}", dir.display());
        Ok(())
    }

    pub fn feature_count(&self) -> usize {
        self.manifest.feature_columns.len()
    }

    /// Minimum candles for one prediction.
    pub fn warmup(&self) -> usize {
        self.deriver.warmup()
    }

    /// Class probabilities for raw (unscaled) feature rows.
    pub fn probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        let scaled = self.manifest.scaler.transform(rows);
        Ok(self.classifier.predict_proba(&scaled)?)
    }

    pub fn features(&self, candles: &[Candle]) -> Result<FeatureTable, ModelError> {
        Ok(self.deriver.derive(candles)?)
    }

    /// One decision per candle with a complete feature window.
    pub fn decide(&self, candles: &[Candle]) -> Result<Vec<BacktestStep>, ModelError> {
        let table = self.features(candles)?;
        let probabilities = self.probabilities(&table.matrix())?;
        let decisions = decision::reduce_all(&probabilities, &self.cutoffs);
        debug!("Decided {} steps", decisions.len());

        Ok(table
            .rows
            .iter()
            .zip(decisions)
            .map(|(row, decision)| BacktestStep::new(row.open_time, decision, row.close))
            .collect())
    }

    /// Decision for the most recent candle.
    pub fn predict_latest(&self, candles: &[Candle]) -> Result<Prediction, ModelError> {
        let table = self.features(candles)?;
        let last = table.last().ok_or(FeatureError::InsufficientHistory {
            required: self.warmup(),
            available: candles.len(),
        })?;
        let probabilities = self
            .probabilities(std::slice::from_ref(&last.values))?
            .into_iter()
            .next()
            .unwrap_or_default();
        let decision = decision::reduce(&probabilities, &self.cutoffs);

        Ok(Prediction {
            asset: self.manifest.asset.clone(),
            open_time: last.open_time,
            close: last.close,
            decision,
            probabilities,
            cutoffs: self.cutoffs.as_slice().to_vec(),
        })
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            loaded: true,
            message: "Model loaded successfully.".to_string(),
            asset: Some(self.manifest.asset.clone()),
            feature_count: Some(self.feature_count()),
            cutoffs: Some(self.cutoffs.as_slice().to_vec()),
            trained_at: Some(self.manifest.trained_at),
        }
    }
}

/// Holds the model currently served over HTTP.
pub struct ModelService {
    model_dir: PathBuf,
    current: RwLock<Option<Arc<ModelBundle>>>,
}

impl ModelService {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            current: RwLock::new(None),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// (Re)load the bundle from the configured directory.
    pub async fn load(&self) -> Result<Arc<ModelBundle>, ModelError> {
        let bundle = Arc::new(ModelBundle::load(&self.model_dir)?);
        *self.current.write().await = Some(bundle.clone());
        Ok(bundle)
    }

    /// Replace the served model.
    pub async fn install(&self, bundle: ModelBundle) -> Arc<ModelBundle> {
        let bundle = Arc::new(bundle);
        *self.current.write().await = Some(bundle.clone());
        bundle
    }

    pub async fn current(&self) -> Result<Arc<ModelBundle>, ModelError> {
        self.current.read().await.clone().ok_or(ModelError::NotLoaded)
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn status(&self) -> ModelStatus {
        match self.current.read().await.as_ref() {
            Some(bundle) => bundle.status(),
            None => ModelStatus::not_loaded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cutoffs_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CUTOFFS_FILE);
        let err = read_cutoffs(&path).unwrap_err();
        assert!(matches!(err, ModelError::CutoffUnreadable { .. }));
        assert!(err.to_string().contains("cutoffs.json"));
    }

    #[test]
    fn test_cutoffs_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CUTOFFS_FILE);
        write_cutoffs(&path, &CutoffSet::new(vec![0.5, 0.25, 0.125])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[0.5,0.25,0.125]");
        assert_eq!(read_cutoffs(&path).unwrap().as_slice(), &[0.5, 0.25, 0.125]);

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            read_cutoffs(&path),
            Err(ModelError::CutoffUnreadable { .. })
        ));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelBundle::load(dir.path()),
            Err(ModelError::ManifestUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_service_starts_unloaded() {
        let service = ModelService::new("/nonexistent/model");
        assert!(!service.is_loaded().await);
        assert!(matches!(service.current().await, Err(ModelError::NotLoaded)));
        assert!(!service.status().await.loaded);
        assert!(service.load().await.is_err());
        assert!(!service.is_loaded().await);
    }
}
