//! Signal Labeler
//!
//! Derives buy/sell/hold training labels from a close-price series:
//! - Local maxima (peaks) are labeled sell
//! - Local minima (valleys) are labeled buy
//! - Everything else is hold
//!
//! Extrema must be at least `distance` samples apart; the more extreme of two
//! close extrema survives. Extrema within `distance` of either end of the
//! series are discarded since their neighbourhood is incomplete.

use crate::types::Label;
use tracing::debug;

/// Default minimum separation as a fraction of series length.
pub const DEFAULT_DISTANCE_FRACTION: f64 = 0.01;

/// Labels close prices by peak/valley detection.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalLabeler {
    /// Minimum separation as a fraction of series length.
    pub distance_fraction: f64,
    /// Absolute minimum separation, overriding `distance_fraction`.
    pub distance: Option<usize>,
    /// Number of following candles that inherit an extremum's label.
    pub widen: usize,
}

impl Default for SignalLabeler {
    fn default() -> Self {
        Self {
            distance_fraction: DEFAULT_DISTANCE_FRACTION,
            distance: None,
            widen: 1,
        }
    }
}

impl SignalLabeler {
    pub fn new(distance_fraction: f64, widen: usize) -> Self {
        Self {
            distance_fraction,
            distance: None,
            widen,
        }
    }

    /// Use a fixed separation regardless of series length.
    pub fn with_distance(mut self, distance: usize) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Minimum separation for a series of `len` samples.
    pub fn distance_for(&self, len: usize) -> usize {
        match self.distance {
            Some(d) => d.max(1),
            None => ((self.distance_fraction * len as f64).ceil() as usize).max(1),
        }
    }

    /// Indices of retained (peaks, valleys).
    pub fn extrema(&self, closes: &[f64]) -> (Vec<usize>, Vec<usize>) {
        let len = closes.len();
        let distance = self.distance_for(len);
        let in_bounds = |idx: &usize| *idx >= distance && idx.saturating_add(distance) < len;

        let peaks: Vec<usize> = find_peaks(closes, distance)
            .into_iter()
            .filter(in_bounds)
            .collect();

        let inverted: Vec<f64> = closes.iter().map(|c| -c).collect();
        let valleys: Vec<usize> = find_peaks(&inverted, distance)
            .into_iter()
            .filter(in_bounds)
            .collect();

        (peaks, valleys)
    }

    /// One label per close price.
    pub fn label(&self, closes: &[f64]) -> Vec<Label> {
        let mut labels = vec![Label::Hold; closes.len()];
        let (peaks, valleys) = self.extrema(closes);

        // Widened neighbours first; they never overwrite an earlier signal
        for (indices, label) in [(&valleys, Label::Buy), (&peaks, Label::Sell)] {
            for &idx in indices.iter() {
                for offset in 1..=self.widen {
                    let Some(slot) = labels.get_mut(idx.saturating_add(offset)) else {
                        break;
                    };
                    if *slot == Label::Hold {
                        *slot = label;
                    }
                }
            }
        }

        for &idx in &valleys {
            labels[idx] = Label::Buy;
        }
        for &idx in &peaks {
            labels[idx] = Label::Sell;
        }

        debug!(
            "Labeled {} closes: {} peaks, {} valleys (distance {})",
            closes.len(),
            peaks.len(),
            valleys.len(),
            self.distance_for(closes.len())
        );

        labels
    }
}

/// Indices of local maxima.
///
/// A sample is a maximum when it is strictly above its left neighbour and
/// strictly above the first differing sample to its right. Flat plateaus
/// report their middle index, rounding down. The first and last samples are
/// never maxima.
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if values.len() < 3 {
        return maxima;
    }

    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                let left = i;
                let right = ahead - 1;
                maxima.push((left + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Local maxima at least `distance` samples apart.
///
/// Higher maxima are kept first; among equal heights the later index wins.
pub fn find_peaks(values: &[f64], distance: usize) -> Vec<usize> {
    let peaks = local_maxima(values);
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| values[peaks[a]].total_cmp(&values[peaks[b]]));

    let mut keep = vec![true; peaks.len()];
    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(peak, kept)| kept.then_some(peak))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima_plateau_midpoint() {
        let values = [0.0, 1.0, 2.0, 2.0, 2.0, 2.0, 1.0, 0.0];
        // plateau 2..=5 reports index 3
        assert_eq!(local_maxima(&values), vec![3]);
    }

    #[test]
    fn test_local_maxima_ignores_edges_and_rising_plateau() {
        assert_eq!(local_maxima(&[5.0, 1.0, 5.0]), Vec::<usize>::new());
        assert_eq!(local_maxima(&[0.0, 1.0, 1.0, 2.0]), Vec::<usize>::new());
    }

    #[test]
    fn test_find_peaks_keeps_higher_peak() {
        let values = [0.0, 3.0, 0.0, 5.0, 0.0, 1.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        assert_eq!(local_maxima(&values), vec![1, 3, 5, 9]);
        assert_eq!(find_peaks(&values, 3), vec![3, 9]);
    }

    #[test]
    fn test_find_peaks_tie_goes_to_later_index() {
        let values = [0.0, 2.0, 0.0, 2.0, 0.0];
        assert_eq!(find_peaks(&values, 3), vec![3]);
    }

    #[test]
    fn test_distance_for() {
        let labeler = SignalLabeler::default();
        assert_eq!(labeler.distance_for(0), 1);
        assert_eq!(labeler.distance_for(50), 1);
        assert_eq!(labeler.distance_for(1000), 10);
        assert_eq!(labeler.distance_for(1001), 11);
        assert_eq!(labeler.clone().with_distance(4).distance_for(1000), 4);
    }

    #[test]
    fn test_single_peak_labels_peak_and_neighbour() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 10.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let labels = SignalLabeler::default().label(&closes);
        let sells: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Label::Sell)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(sells, vec![5, 6]);
        assert!(!labels.contains(&Label::Buy));
    }

    #[test]
    fn test_valley_labels_buy() {
        let closes = [9.0, 8.0, 7.0, 6.0, 2.0, 6.0, 7.0, 8.0, 9.0];
        let labels = SignalLabeler::new(0.01, 0).label(&closes);
        assert_eq!(labels[4], Label::Buy);
        assert_eq!(labels.iter().filter(|l| **l == Label::Buy).count(), 1);
    }

    #[test]
    fn test_boundary_extrema_are_discarded() {
        let closes = [1.0, 5.0, 1.0, 1.0, 1.0, 1.0];
        let labeler = SignalLabeler::default().with_distance(2);
        assert!(labeler.label(&closes).iter().all(|l| *l == Label::Hold));
    }

    #[test]
    fn test_oversized_distance_and_widen_keep_all_hold() {
        let closes = [1.0, 2.0, 3.0, 10.0, 3.0, 2.0, 1.0];
        let labeler = SignalLabeler::new(DEFAULT_DISTANCE_FRACTION, usize::MAX)
            .with_distance(usize::MAX);
        assert_eq!(labeler.extrema(&closes), (vec![], vec![]));
        assert!(labeler.label(&closes).iter().all(|l| *l == Label::Hold));
    }

    #[test]
    fn test_huge_widen_stops_at_series_end() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 10.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let labels = SignalLabeler::new(DEFAULT_DISTANCE_FRACTION, usize::MAX)
            .with_distance(2)
            .label(&closes);
        assert_eq!(labels[5], Label::Sell);
        assert!(labels[6..].iter().all(|l| *l == Label::Sell));
    }

    #[test]
    fn test_extremum_wins_over_widening() {
        // Peak at 2 widens onto 3, which is itself a valley
        let closes = [0.0, 1.0, 5.0, 0.0, 4.0, 1.0, 0.0];
        let labels = SignalLabeler::default().with_distance(1).label(&closes);
        assert_eq!(labels[2], Label::Sell);
        assert_eq!(labels[3], Label::Buy);
        assert_eq!(labels[4], Label::Sell);
        assert_eq!(labels[5], Label::Sell);
    }
}
