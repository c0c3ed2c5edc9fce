use super::{check_shapes, UpdateRule};
use crate::error::Result;
use crate::math::matrix::Matrix;

/// Adam with bias correction folded into the step size.
///
/// Moment buffers are created lazily on the first step, shaped like the
/// parameters they track, and live only as long as this value.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    beta1_t: f64,
    beta2_t: f64,
    v: Vec<Matrix>,
    s: Vec<Matrix>,
}

impl Adam {
    pub const BETA1: f64 = 0.9;
    pub const BETA2: f64 = 0.999;
    pub const EPSILON: f64 = 1e-8;

    pub fn new(learning_rate: f64) -> Self {
        Self::with_hyperparams(learning_rate, Self::BETA1, Self::BETA2, Self::EPSILON)
    }

    pub fn with_hyperparams(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            beta1_t: 1.0,
            beta2_t: 1.0,
            v: Vec::new(),
            s: Vec::new(),
        }
    }
}

impl UpdateRule for Adam {
    fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) -> Result<()> {
        check_shapes(&params, grads)?;
        if self.v.len() != grads.len() {
            self.v = grads.iter().map(Matrix::zeros_like).collect();
            self.s = grads.iter().map(Matrix::zeros_like).collect();
        }

        let Self { learning_rate: lr, beta1: b1, beta2: b2, epsilon: eps, .. } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;
        let step_size = lr * (1.0 - self.beta2_t).sqrt() / (1.0 - self.beta1_t);

        for (((param, grad), v), s) in params.into_iter()
            .zip(grads)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
        {
            for (((p, g), v), s) in param.iter_mut()
                .zip(grad.iter())
                .zip(v.iter_mut())
                .zip(s.iter_mut())
            {
                *v = b1 * *v + (1.0 - b1) * g;
                *s = b2 * *s + (1.0 - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        // With bias correction the first update is ±lr regardless of |g|.
        let mut w = Matrix::from_data(vec![vec![1.0, 1.0]]);
        let g = Matrix::from_data(vec![vec![4.0, -0.01]]);
        Adam::new(0.1).step(vec![&mut w], &[g]).unwrap();
        assert!((w.data[0][0] - 0.9).abs() < 1e-6);
        assert!((w.data[0][1] - 1.1).abs() < 1e-4);
    }
}
