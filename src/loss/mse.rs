use super::{one_hot, Loss};

/// Mean squared error between raw scores and the one-hot target.
pub struct MseLoss;

impl Loss for MseLoss {
    /// mean((scores - y)²)
    fn loss(scores: &[f64], label: usize) -> f64 {
        let n = scores.len().max(1) as f64;
        scores.iter().zip(one_hot(label, scores.len()))
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>() / n
    }

    /// 2(scores - y) / n
    fn derivative(scores: &[f64], label: usize) -> Vec<f64> {
        let n = scores.len().max(1) as f64;
        scores.iter().zip(one_hot(label, scores.len()))
            .map(|(a, b)| 2.0 * (a - b) / n)
            .collect()
    }
}
