use serde::{Serialize, Deserialize};

use crate::error::{ModelgenError, Result};

/// Running correct / total counts for one accuracy sweep.
///
/// Starts at zero for every sweep and is threaded by value from one
/// [`accumulate`] call to the next; nothing is mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccuracyState {
    pub n_total: usize,
    pub n_correct: usize,
}

impl AccuracyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage of correct predictions; 0 when nothing has been counted.
    pub fn accuracy(&self) -> f64 {
        if self.n_total == 0 {
            return 0.0;
        }
        100.0 * self.n_correct as f64 / self.n_total as f64
    }

    /// Combines the counts of two independent sweeps over disjoint data.
    pub fn merge(self, other: AccuracyState) -> AccuracyState {
        AccuracyState {
            n_total: self.n_total + other.n_total,
            n_correct: self.n_correct + other.n_correct,
        }
    }
}

/// Index of the largest score, ties going to the lowest index.
///
/// NaN never wins a comparison, so a row of all NaN predicts class 0.
pub fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] || (scores[best].is_nan() && !s.is_nan()) {
            best = i;
        }
    }
    best
}

/// Number of rows whose argmax matches the label.
fn count_correct<S: AsRef<[f64]>>(predicted_scores: &[S], true_labels: &[usize]) -> usize {
    predicted_scores.iter()
        .zip(true_labels)
        .filter(|&(row, &label)| argmax(row.as_ref()) == label)
        .count()
}

/// Folds one batch of predictions into `prior` and returns the running
/// accuracy (percent) together with the updated state.
///
/// `predicted_scores` has one row per example and one column per class;
/// scores need not be normalised. Fails without touching any counts when the
/// row count differs from the label count or a row has no scores.
pub fn accumulate<S: AsRef<[f64]>>(
    predicted_scores: &[S],
    true_labels: &[usize],
    prior: AccuracyState,
) -> Result<(f64, AccuracyState)> {
    if predicted_scores.len() != true_labels.len() {
        return Err(ModelgenError::InvalidInput(format!(
            "{} score rows but {} labels",
            predicted_scores.len(),
            true_labels.len()
        )));
    }
    if let Some(row) = predicted_scores.iter().position(|r| r.as_ref().is_empty()) {
        return Err(ModelgenError::InvalidInput(format!("score row {row} is empty")));
    }

    let batch = AccuracyState {
        n_total: true_labels.len(),
        n_correct: count_correct(predicted_scores, true_labels),
    };
    let state = prior.merge(batch);
    Ok((state.accuracy(), state))
}

/// Two-class entry point. Requires exactly two score columns and otherwise
/// applies the same first-occurrence argmax rule as [`accumulate`].
pub fn accumulate_binary<S: AsRef<[f64]>>(
    predicted_scores: &[S],
    true_labels: &[usize],
    prior: AccuracyState,
) -> Result<(f64, AccuracyState)> {
    if let Some(row) = predicted_scores.iter().position(|r| r.as_ref().len() != 2) {
        return Err(ModelgenError::InvalidInput(format!(
            "binary accuracy needs 2 score columns, row {row} has {}",
            predicted_scores[row].as_ref().len()
        )));
    }
    accumulate(predicted_scores, true_labels, prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

    const SEED: u64 = 1234;

    /// Random normalised score rows plus labels of which exactly
    /// `n_wrong` disagree with the argmax.
    fn fake_batch(rng: &mut StdRng, batch: usize, classes: usize, n_wrong: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let scores: Vec<Vec<f64>> = (0..batch)
            .map(|_| {
                let row: Vec<f64> = (0..classes).map(|_| rng.gen::<f64>()).collect();
                let sum: f64 = row.iter().sum();
                row.into_iter().map(|x| x / sum).collect()
            })
            .collect();
        let mut labels: Vec<usize> = scores.iter().map(|r| argmax(r)).collect();
        for i in sample(rng, batch, n_wrong) {
            labels[i] = (labels[i] + 1) % classes;
        }
        (scores, labels)
    }

    #[test]
    fn single_batch_accuracy() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let (scores, labels) = fake_batch(&mut rng, 32, 5, 6);
        let (acc, state) = accumulate(&scores, &labels, AccuracyState::new()).unwrap();
        assert_eq!(state, AccuracyState { n_total: 32, n_correct: 26 });
        assert!((acc - 26.0 / 32.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn running_accuracy_adds_to_prior_counts() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let (scores, labels) = fake_batch(&mut rng, 32, 5, 6);
        let prior = AccuracyState { n_total: 64, n_correct: 50 };
        let (acc, state) = accumulate(&scores, &labels, prior).unwrap();
        assert_eq!(state, AccuracyState { n_total: 96, n_correct: 76 });
        assert!((acc - 79.166_666_666).abs() < 1e-6);
    }

    #[test]
    fn binary_matches_general_rule() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let (scores, labels) = fake_batch(&mut rng, 32, 2, 6);
        let prior = AccuracyState { n_total: 64, n_correct: 50 };
        let general = accumulate(&scores, &labels, prior).unwrap();
        let binary = accumulate_binary(&scores, &labels, prior).unwrap();
        assert_eq!(general, binary);
        assert_eq!(binary.1, AccuracyState { n_total: 96, n_correct: 76 });
    }

    #[test]
    fn binary_rejects_wrong_width() {
        let scores = vec![vec![0.1, 0.2, 0.7]];
        assert!(accumulate_binary(&scores, &[2], AccuracyState::new()).is_err());
    }

    #[test]
    fn ties_go_to_lowest_index() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[f64::NAN, 0.3]), 1);
        let (_, state) = accumulate(&[[0.5, 0.5]], &[1], AccuracyState::new()).unwrap();
        assert_eq!(state.n_correct, 0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let prior = AccuracyState { n_total: 3, n_correct: 1 };
        let err = accumulate(&[vec![1.0, 0.0]], &[0, 1], prior).unwrap_err();
        assert!(matches!(err, ModelgenError::InvalidInput(_)));
    }

    #[test]
    fn zero_width_rows_are_rejected() {
        let scores: Vec<Vec<f64>> = vec![vec![0.2, 0.8], vec![]];
        let err = accumulate(&scores, &[0, 0], AccuracyState::new()).unwrap_err();
        assert!(matches!(err, ModelgenError::InvalidInput(_)));
    }

    #[test]
    fn empty_sweep_is_zero_percent() {
        let empty: [Vec<f64>; 0] = [];
        let (acc, state) = accumulate(&empty, &[], AccuracyState::new()).unwrap();
        assert_eq!(acc, 0.0);
        assert_eq!(state, AccuracyState::new());
    }

    #[test]
    fn split_batches_match_whole_batch() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let (scores, labels) = fake_batch(&mut rng, 40, 4, 11);

        let whole = accumulate(&scores, &labels, AccuracyState::new()).unwrap();
        let mut state = AccuracyState::new();
        for cut in [(0, 7), (7, 8), (8, 31), (31, 40)] {
            let (_, next) = accumulate(&scores[cut.0..cut.1], &labels[cut.0..cut.1], state).unwrap();
            assert!(next.n_correct <= next.n_total);
            assert_eq!(next.n_total, cut.1);
            state = next;
        }
        assert_eq!(state, whole.1);
        assert_eq!(state.accuracy(), whole.0);
    }
}
