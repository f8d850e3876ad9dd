//! Threshold Calibration
//!
//! Picks one probability cutoff per class from its one-vs-rest ROC curve by
//! maximising Youden's J (TPR - FPR). The returned cutoff is placed between
//! the chosen score and the next lower one, so `probability > cutoff`
//! reproduces the chosen ROC point exactly.

use crate::types::CutoffSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Calibration errors.
#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration set is empty")]
    Empty,
    #[error("Label count {labels} does not match probability rows {rows}")]
    LengthMismatch { labels: usize, rows: usize },
    #[error("Probability row {row} has {found} classes, expected {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Class {class} has no positive or no negative samples; ROC is undefined")]
    DegenerateClass { class: usize },
}

/// One point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Scores at or above this value are positive. `INFINITY` for the
    /// "nothing is positive" point.
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

impl RocPoint {
    /// Youden's J statistic.
    pub fn youden_j(&self) -> f64 {
        self.tpr - self.fpr
    }
}

/// ROC curve over every distinct score, highest threshold first.
#[derive(Debug, Clone)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Build the curve for binary `positives` and matching `scores`.
    ///
    /// Returns `None` when either class is missing.
    pub fn compute(positives: &[bool], scores: &[f64]) -> Option<Self> {
        let total_pos = positives.iter().filter(|p| **p).count();
        let total_neg = positives.len() - total_pos;
        if total_pos == 0 || total_neg == 0 {
            return None;
        }

        let mut pairs: Vec<(f64, bool)> = scores
            .iter()
            .copied()
            .zip(positives.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut points = vec![RocPoint {
            threshold: f64::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        }];

        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;
        while i < pairs.len() {
            let score = pairs[i].0;
            while i < pairs.len() && pairs[i].0 == score {
                if pairs[i].1 {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                threshold: score,
                fpr: fp as f64 / total_neg as f64,
                tpr: tp as f64 / total_pos as f64,
            });
        }

        Some(Self { points })
    }

    /// Area under the curve (trapezoidal).
    pub fn auc(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum()
    }

    /// Index of the first point with maximal Youden's J.
    pub fn youden_index(&self) -> usize {
        let mut best = 0;
        for (i, point) in self.points.iter().enumerate() {
            if point.youden_j() > self.points[best].youden_j() {
                best = i;
            }
        }
        best
    }

    /// Cutoff for use with a strict `>` comparison.
    pub fn optimal_cutoff(&self) -> f64 {
        let best = self.youden_index();
        if best == 0 {
            return 1.0;
        }
        let chosen = self.points[best].threshold;
        match self.points.get(best + 1) {
            Some(next) => (chosen + next.threshold) / 2.0,
            None => chosen - 1.0,
        }
    }
}

/// Calibration summary for one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCalibration {
    pub class: usize,
    pub cutoff: f64,
    pub auc: f64,
    pub youden_j: f64,
    pub tpr: f64,
    pub fpr: f64,
}

/// Result of calibrating every class.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub cutoffs: CutoffSet,
    pub classes: Vec<ClassCalibration>,
}

/// Calibrate one cutoff per class from encoded labels and class probabilities.
pub fn calibrate(
    labels: &[usize],
    probabilities: &[Vec<f64>],
    class_count: usize,
) -> Result<Calibration, CalibrationError> {
    if labels.is_empty() {
        return Err(CalibrationError::Empty);
    }
    if labels.len() != probabilities.len() {
        return Err(CalibrationError::LengthMismatch {
            labels: labels.len(),
            rows: probabilities.len(),
        });
    }
    if let Some((row, probs)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| p.len() != class_count)
    {
        return Err(CalibrationError::WidthMismatch {
            row,
            expected: class_count,
            found: probs.len(),
        });
    }

    let mut cutoffs = Vec::with_capacity(class_count);
    let mut classes = Vec::with_capacity(class_count);

    for class in 0..class_count {
        let positives: Vec<bool> = labels.iter().map(|l| *l == class).collect();
        let scores: Vec<f64> = probabilities.iter().map(|p| p[class]).collect();
        let curve = RocCurve::compute(&positives, &scores)
            .ok_or(CalibrationError::DegenerateClass { class })?;

        let best = curve.points[curve.youden_index()];
        let cutoff = curve.optimal_cutoff();
        let summary = ClassCalibration {
            class,
            cutoff,
            auc: curve.auc(),
            youden_j: best.youden_j(),
            tpr: best.tpr,
            fpr: best.fpr,
        };
        debug!(
            "Class {} calibrated: cutoff {:.4}, AUC {:.3}, J {:.3}",
            class, summary.cutoff, summary.auc, summary.youden_j
        );

        cutoffs.push(cutoff);
        classes.push(summary);
    }

    Ok(Calibration {
        cutoffs: CutoffSet::new(cutoffs),
        classes,
    })
}

/// Row = true class, column = predicted class.
pub fn confusion_matrix(
    labels: &[usize],
    predictions: &[usize],
    class_count: usize,
) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0; class_count]; class_count];
    for (&actual, &predicted) in labels.iter().zip(predictions) {
        if actual < class_count && predicted < class_count {
            matrix[actual][predicted] += 1;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roc_points() {
        let curve = RocCurve::compute(&[true, false, true, false], &[0.9, 0.8, 0.7, 0.1]).unwrap();
        let tprs: Vec<f64> = curve.points.iter().map(|p| p.tpr).collect();
        let fprs: Vec<f64> = curve.points.iter().map(|p| p.fpr).collect();
        assert_eq!(tprs, vec![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert_eq!(fprs, vec![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(curve.auc(), 0.75);
    }

    #[test]
    fn test_tied_scores_share_a_point() {
        let curve = RocCurve::compute(&[true, false, true], &[0.5, 0.5, 0.2]).unwrap();
        assert_eq!(curve.points.len(), 3);
        assert_eq!(curve.points[1].threshold, 0.5);
        assert_eq!(curve.points[1].tpr, 0.5);
        assert_eq!(curve.points[1].fpr, 1.0);
    }

    #[test]
    fn test_separable_cutoff_is_midpoint() {
        let curve = RocCurve::compute(&[false, false, true, true], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(curve.points[curve.youden_index()].threshold, 0.8);
        assert_eq!(curve.optimal_cutoff(), 0.5);
        assert_eq!(curve.auc(), 1.0);
    }

    #[test]
    fn test_inverted_scores_never_trigger() {
        let curve = RocCurve::compute(&[true, false], &[0.1, 0.9]).unwrap();
        assert_eq!(curve.youden_index(), 0);
        assert_eq!(curve.optimal_cutoff(), 1.0);
    }

    #[test]
    fn test_degenerate_class() {
        assert!(RocCurve::compute(&[true, true], &[0.1, 0.2]).is_none());

        let labels = vec![0, 0, 2];
        let probs = vec![vec![0.6, 0.2, 0.2]; 3];
        let err = calibrate(&labels, &probs, 3).unwrap_err();
        assert_eq!(err, CalibrationError::DegenerateClass { class: 1 });
    }

    #[test]
    fn test_input_validation() {
        assert_eq!(calibrate(&[], &[], 3).unwrap_err(), CalibrationError::Empty);
        assert_eq!(
            calibrate(&[0], &[], 3).unwrap_err(),
            CalibrationError::LengthMismatch { labels: 1, rows: 0 }
        );
        assert_eq!(
            calibrate(&[0], &[vec![1.0]], 3).unwrap_err(),
            CalibrationError::WidthMismatch {
                row: 0,
                expected: 3,
                found: 1
            }
        );
    }

    #[test]
    fn test_confusion_matrix() {
        let matrix = confusion_matrix(&[0, 1, 2, 2], &[0, 2, 2, 1], 3);
        assert_eq!(matrix, vec![vec![1, 0, 0], vec![0, 0, 1], vec![0, 1, 1]]);
    }
}
