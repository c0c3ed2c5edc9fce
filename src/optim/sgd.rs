use super::{check_shapes, UpdateRule};
use crate::error::Result;
use crate::math::matrix::Matrix;

/// Plain stochastic gradient descent: p -= lr · g.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl UpdateRule for Sgd {
    fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) -> Result<()> {
        check_shapes(&params, grads)?;
        let lr = self.learning_rate;
        for (param, grad) in params.into_iter().zip(grads) {
            for (p, g) in param.iter_mut().zip(grad.iter()) {
                *p -= lr * g;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_against_the_gradient() {
        let mut w = Matrix::from_data(vec![vec![1.0, 2.0]]);
        let g = Matrix::from_data(vec![vec![0.5, -1.0]]);
        Sgd::new(0.1).step(vec![&mut w], &[g]).unwrap();
        assert_eq!(w.data, vec![vec![0.95, 2.1]]);
    }

    #[test]
    fn rejects_gradient_count_mismatch() {
        let mut w = Matrix::zeros(1, 1);
        assert!(Sgd::new(0.1).step(vec![&mut w], &[]).is_err());
    }
}
