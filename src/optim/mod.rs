pub mod adam;
pub mod algorithm;
pub mod sgd;

pub use adam::Adam;
pub use algorithm::OptimizerAlgorithm;
pub use sgd::Sgd;

use crate::error::{ModelgenError, Result};
use crate::math::matrix::Matrix;

/// Defines how model parameters move given their (batch-averaged) gradients.
pub trait UpdateRule {
    /// Applies one update step. `grads[i]` belongs to `params[i]`.
    fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) -> Result<()>;
}

pub(crate) fn check_shapes(params: &[&mut Matrix], grads: &[Matrix]) -> Result<()> {
    if params.len() != grads.len() {
        return Err(ModelgenError::InvalidInput(format!(
            "model returned {} gradients for {} parameters",
            grads.len(),
            params.len()
        )));
    }
    for (i, (p, g)) in params.iter().zip(grads).enumerate() {
        if (p.rows, p.cols) != (g.rows, g.cols) {
            return Err(ModelgenError::InvalidInput(format!(
                "gradient {i} is {}x{}, parameter is {}x{}",
                g.rows, g.cols, p.rows, p.cols
            )));
        }
    }
    Ok(())
}
