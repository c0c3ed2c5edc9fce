use super::{one_hot, Loss};
use crate::activation::activation::sigmoid;

/// Binary cross-entropy with logits, one independent sigmoid per output.
pub struct BceLoss;

const EPS: f64 = 1e-12;

impl Loss for BceLoss {
    /// -mean(y·log(p+ε) + (1-y)·log(1-p+ε)),  p = σ(score)
    fn loss(scores: &[f64], label: usize) -> f64 {
        let n = scores.len().max(1) as f64;
        scores.iter().zip(one_hot(label, scores.len()))
            .map(|(s, y)| {
                let p = sigmoid(*s);
                -(y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln())
            })
            .sum::<f64>() / n
    }

    /// (σ(score) - y) / n
    fn derivative(scores: &[f64], label: usize) -> Vec<f64> {
        let n = scores.len().max(1) as f64;
        scores.iter().zip(one_hot(label, scores.len()))
            .map(|(s, y)| (sigmoid(*s) - y) / n)
            .collect()
    }
}
