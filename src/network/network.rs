use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, layers::dense::Layer};
use crate::error::{ModelgenError, Result};
use crate::math::matrix::Matrix;
use crate::network::model::Model;

/// A feed-forward stack of dense layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples, drawing
    /// initial weights from `rng`.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Network { layers }
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ModelgenError::storage(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| ModelgenError::storage(path, e))?;
        writer.flush().map_err(|e| ModelgenError::storage(path, e))
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Network> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ModelgenError::storage(path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ModelgenError::storage(path, e))
    }
}

impl Model for Network {
    fn input_size(&self) -> usize {
        self.layers.first().map_or(0, Layer::input_size)
    }

    fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current
    }

    fn backward(&mut self, input: &[f64], output_grad: &[f64]) -> Vec<Matrix> {
        let mut grads: Vec<Matrix> = Vec::with_capacity(2 * self.layers.len());
        let mut delta = Matrix::row(output_grad);

        for i in (0..self.layers.len()).rev() {
            let input_for_layer = if i == 0 {
                Matrix::row(input)
            } else {
                self.layers[i - 1].neurons.clone()
            };
            let g = self.layers[i].compute_gradients(&delta, &input_for_layer);
            delta = g.input_delta;
            // pushed in reverse so the final reverse() restores [w0, b0, w1, b1, ..]
            grads.push(g.biases);
            grads.push(g.weights);
        }

        grads.reverse();
        grads
    }

    fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        self.layers.iter_mut()
            .flat_map(|layer| [&mut layer.weights, &mut layer.biases])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn tiny() -> Network {
        Network::new(
            vec![(3, 2, ActivationFunction::Tanh), (2, 3, ActivationFunction::Identity)],
            &mut StdRng::seed_from_u64(1234),
        )
    }

    #[test]
    fn gradients_align_with_parameters() {
        let mut net = tiny();
        let out = net.forward(&[0.5, -0.5]);
        assert_eq!(out.len(), 2);

        let grads = net.backward(&[0.5, -0.5], &[1.0, 0.0]);
        let shapes: Vec<_> = net.parameters_mut().iter().map(|p| (p.rows, p.cols)).collect();
        let grad_shapes: Vec<_> = grads.iter().map(|g| (g.rows, g.cols)).collect();
        assert_eq!(shapes, grad_shapes);
        assert_eq!(shapes, vec![(2, 3), (1, 3), (3, 2), (1, 2)]);
    }

    #[test]
    fn backward_matches_finite_difference() {
        let input = [0.3, -0.7];
        let mut net = tiny();
        // L = scores[0]
        net.forward(&input);
        let grads = net.backward(&input, &[1.0, 0.0]);

        let h = 1e-6;
        let mut bumped = net.clone();
        bumped.layers[0].weights.data[1][2] += h;
        let plus = bumped.forward(&input)[0];
        bumped.layers[0].weights.data[1][2] -= 2.0 * h;
        let minus = bumped.forward(&input)[0];
        let numeric = (plus - minus) / (2.0 * h);

        assert!((grads[0].data[1][2] - numeric).abs() < 1e-6);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let mut net = tiny();
        net.save_json(&path).unwrap();
        let mut loaded = Network::load_json(&path).unwrap();
        assert_eq!(net.forward(&[1.0, 2.0]), loaded.forward(&[1.0, 2.0]));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_reports_write_failures() {
        // /dev/full accepts the open but fails every write, including the final flush.
        let err = tiny().save_json("/dev/full").unwrap_err();
        assert!(matches!(err, ModelgenError::Storage { .. }));
    }
}
