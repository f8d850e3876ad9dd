use serde::{Deserialize, Serialize};

use super::Decision;

/// Per-class probability cutoffs, index-aligned to the label encoding.
///
/// Serialized as a bare JSON array of floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CutoffSet {
    cutoffs: Vec<f64>,
}

impl CutoffSet {
    pub fn new(cutoffs: Vec<f64>) -> Self {
        Self { cutoffs }
    }

    /// Cutoff for a class index.
    pub fn get(&self, class: usize) -> Option<f64> {
        self.cutoffs.get(class).copied()
    }

    pub fn len(&self) -> usize {
        self.cutoffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cutoffs.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.cutoffs
    }

    /// Whether a class probability exceeds its cutoff.
    pub fn triggered(&self, class: usize, probability: f64) -> bool {
        self.get(class).map(|c| probability > c).unwrap_or(false)
    }
}

/// Live inference result for the latest candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub asset: String,
    pub open_time: i64,
    pub close: f64,
    pub decision: Decision,
    pub probabilities: Vec<f64>,
    pub cutoffs: Vec<f64>,
}

/// Status of the model held by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub loaded: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoffs: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<i64>,
}

impl ModelStatus {
    pub fn not_loaded() -> Self {
        Self {
            loaded: false,
            message: "Model not loaded. Please load the model first.".to_string(),
            asset: None,
            feature_count: None,
            cutoffs: None,
            trained_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_set_is_plain_array() {
        let cutoffs = CutoffSet::new(vec![0.25, 0.5, 0.75]);
        let json = serde_json::to_string(&cutoffs).unwrap();
        assert_eq!(json, "[0.25,0.5,0.75]");

        let parsed: CutoffSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cutoffs);
    }

    #[test]
    fn test_cutoff_triggered_is_strict() {
        let cutoffs = CutoffSet::new(vec![0.4, 0.5, 0.6]);
        assert!(cutoffs.triggered(0, 0.41));
        assert!(!cutoffs.triggered(0, 0.4));
        assert!(!cutoffs.triggered(5, 1.0));
    }
}
