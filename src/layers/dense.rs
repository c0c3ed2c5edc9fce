use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Gradients for one dense layer, plus the error to hand to the layer below.
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
    /// ∂L/∂a of the previous layer's activations.
    pub input_delta: Matrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    /// Activations from the last forward pass.
    #[serde(skip)]
    pub neurons: Matrix,
    // pre-activation z = xW + b from the last forward pass, needed for σ'(z)
    #[serde(skip)]
    pre_neurons: Matrix,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        Layer {
            size,
            weights: activation.init_weights(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation,
            neurons: Matrix::zeros(1, size),
            pre_neurons: Matrix::zeros(1, size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn feed_from(&mut self, input: &[f64]) -> Vec<f64> {
        let z = &Matrix::row(input) * &self.weights + self.biases.clone();
        let a = z.map(|x| self.activator.function(x));
        self.pre_neurons = z;
        self.neurons = a;
        self.neurons.data.first().cloned().unwrap_or_default()
    }

    /// Backpropagates `delta` (∂L/∂a for this layer) through the activation
    /// and linear transform of the last `feed_from` call.
    pub fn compute_gradients(&self, delta: &Matrix, inputs: &Matrix) -> LayerGradients {
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let layer_delta = delta.hadamard(&act_derivative);

        LayerGradients {
            weights: &inputs.transpose() * &layer_delta,
            input_delta: &layer_delta * &self.weights.transpose(),
            biases: layer_delta,
        }
    }
}
