//! Median/IQR feature scaling.

use serde::{Deserialize, Serialize};

/// Per-column robust scaler: `(x - median) / IQR`.
///
/// Fitted on training rows and persisted with the model so inference sees
/// exactly the same transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustScaler {
    pub centers: Vec<f64>,
    pub scales: Vec<f64>,
}

impl RobustScaler {
    /// Fit on a row-major matrix. Returns `None` for an empty matrix.
    pub fn fit(rows: &[Vec<f64>]) -> Option<Self> {
        let width = rows.first()?.len();
        let mut centers = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);

        for column in 0..width {
            let mut values: Vec<f64> = rows.iter().map(|r| r[column]).collect();
            values.sort_by(|a, b| a.total_cmp(b));

            let q1 = quantile(&values, 0.25);
            let median = quantile(&values, 0.5);
            let q3 = quantile(&values, 0.75);
            let iqr = q3 - q1;

            centers.push(median);
            scales.push(if iqr == 0.0 { 1.0 } else { iqr });
        }

        Some(Self { centers, scales })
    }

    pub fn width(&self) -> usize {
        self.centers.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.centers.iter().zip(&self.scales))
            .map(|(x, (center, scale))| (x - center) / scale)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
