use super::{one_hot, Loss};

/// Categorical cross-entropy on logits: softmax followed by negative log likelihood.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

/// Numerically stable softmax (shifted by the max score).
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl Loss for CrossEntropyLoss {
    /// L = -log(softmax(scores)[label] + eps)
    fn loss(scores: &[f64], label: usize) -> f64 {
        let p = softmax(scores).get(label).copied().unwrap_or(0.0);
        -(p + EPS).ln()
    }

    /// Combined softmax + NLL gradient w.r.t. the logits: p_i - y_i.
    fn derivative(scores: &[f64], label: usize) -> Vec<f64> {
        softmax(scores).into_iter()
            .zip(one_hot(label, scores.len()))
            .map(|(p, y)| p - y)
            .collect()
    }
}
