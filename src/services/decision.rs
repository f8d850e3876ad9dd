//! Decision reducer: class probabilities + cutoffs → one trading decision.
//!
//! Buy is checked before sell, so a step where both classes clear their
//! cutoffs is a buy. The hold cutoff is never consulted; anything that is
//! neither buy nor sell is hold.

use crate::types::{CutoffSet, Decision, Label};

/// Reduce one probability vector to a decision.
pub fn reduce(probabilities: &[f64], cutoffs: &CutoffSet) -> Decision {
    let triggered = |label: Label| {
        probabilities
            .get(label.class_index())
            .map(|p| cutoffs.triggered(label.class_index(), *p))
            .unwrap_or(false)
    };

    if triggered(Label::Buy) {
        Decision::Buy
    } else if triggered(Label::Sell) {
        Decision::Sell
    } else {
        Decision::Hold
    }
}

/// Reduce a batch of probability vectors.
pub fn reduce_all(probabilities: &[Vec<f64>], cutoffs: &CutoffSet) -> Vec<Decision> {
    probabilities.iter().map(|p| reduce(p, cutoffs)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutoffs() -> CutoffSet {
        CutoffSet::new(vec![0.3, 0.5, 0.3])
    }

    #[test]
    fn test_buy_regardless_of_sell() {
        assert_eq!(reduce(&[0.31, 0.0, 0.29], &cutoffs()), Decision::Buy);
        assert_eq!(reduce(&[0.31, 0.0, 0.0], &cutoffs()), Decision::Buy);
    }

    #[test]
    fn test_buy_wins_when_both_trigger() {
        assert_eq!(reduce(&[0.35, 0.0, 0.65], &cutoffs()), Decision::Buy);
    }

    #[test]
    fn test_sell_when_only_sell_triggers() {
        assert_eq!(reduce(&[0.1, 0.2, 0.7], &cutoffs()), Decision::Sell);
    }

    #[test]
    fn test_hold_cutoff_is_ignored() {
        // Hold probability far above its cutoff changes nothing
        assert_eq!(reduce(&[0.3, 0.99, 0.3], &cutoffs()), Decision::Hold);
        assert_eq!(reduce(&[0.31, 0.99, 0.0], &cutoffs()), Decision::Buy);
    }

    #[test]
    fn test_cutoff_is_exclusive() {
        assert_eq!(reduce(&[0.3, 0.4, 0.3], &cutoffs()), Decision::Hold);
    }

    #[test]
    fn test_reduce_all() {
        let probs = vec![vec![0.9, 0.05, 0.05], vec![0.05, 0.05, 0.9]];
        assert_eq!(
            reduce_all(&probs, &cutoffs()),
            vec![Decision::Buy, Decision::Sell]
        );
    }
}
