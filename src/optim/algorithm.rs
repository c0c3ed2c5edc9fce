use std::fmt;

use serde::{Serialize, Deserialize};

use super::{Adam, Sgd, UpdateRule};

/// Identifies the parameter update rule used during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerAlgorithm {
    Sgd,
    #[default]
    Adam,
}

impl OptimizerAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerAlgorithm::Sgd  => "sgd",
            OptimizerAlgorithm::Adam => "adam",
        }
    }

    /// Fresh update-rule state for one training run.
    pub fn build(&self, learning_rate: f64) -> Box<dyn UpdateRule> {
        match self {
            OptimizerAlgorithm::Sgd  => Box::new(Sgd::new(learning_rate)),
            OptimizerAlgorithm::Adam => Box::new(Adam::new(learning_rate)),
        }
    }
}

impl fmt::Display for OptimizerAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
