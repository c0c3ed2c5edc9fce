use crate::math::matrix::Matrix;

/// A trainable, parameterised function from a feature vector to per-class scores.
///
/// Optimizers only ever see a model through this trait; the architecture
/// behind it is the model's own business.
pub trait Model {
    /// Number of features `forward` expects.
    fn input_size(&self) -> usize;

    /// Evaluates the model on one example, returning raw (unnormalised) scores.
    /// Implementations may cache intermediate values for the next `backward`.
    fn forward(&mut self, input: &[f64]) -> Vec<f64>;

    /// Backpropagates `output_grad` (∂L/∂scores) for the most recent `forward`
    /// call on `input`. The returned gradients line up one-to-one with
    /// [`Model::parameters_mut`].
    fn backward(&mut self, input: &[f64], output_grad: &[f64]) -> Vec<Matrix>;

    fn parameters_mut(&mut self) -> Vec<&mut Matrix>;
}
