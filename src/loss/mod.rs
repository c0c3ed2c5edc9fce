pub mod bce;
pub mod cross_entropy;
pub mod loss_type;
pub mod mse;

pub use bce::BceLoss;
pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossType;
pub use mse::MseLoss;

/// A per-example classification loss over raw model scores.
///
/// `label` is a class index into `scores`; targets are treated as the
/// corresponding one-hot vector.
pub trait Loss {
    fn loss(scores: &[f64], label: usize) -> f64;

    /// ∂L/∂scores for one example.
    fn derivative(scores: &[f64], label: usize) -> Vec<f64>;
}

pub(crate) fn one_hot(label: usize, n_classes: usize) -> impl Iterator<Item = f64> {
    (0..n_classes).map(move |i| if i == label { 1.0 } else { 0.0 })
}
