use std::fmt;

use serde::{Serialize, Deserialize};

use super::{BceLoss, CrossEntropyLoss, Loss, MseLoss};

/// Identifies the loss function a training run minimises.
///
/// The serialized (snake_case) name is used in persisted configs; the
/// canonical string of an optimizer uses [`LossType::canonical_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
    BinaryCrossEntropy,
}

impl LossType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossType::CrossEntropy       => "cross_entropy",
            LossType::Mse                => "mse",
            LossType::BinaryCrossEntropy => "binary_cross_entropy",
        }
    }

    /// Name used in an optimizer's canonical string. Part of cache keys, so
    /// these must not change.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            LossType::CrossEntropy       => "cross_entropy_loss",
            LossType::Mse                => "mse_loss",
            LossType::BinaryCrossEntropy => "binary_cross_entropy_loss",
        }
    }

    /// Scalar loss for one example.
    pub fn loss(&self, scores: &[f64], label: usize) -> f64 {
        match self {
            LossType::CrossEntropy       => CrossEntropyLoss::loss(scores, label),
            LossType::Mse                => MseLoss::loss(scores, label),
            LossType::BinaryCrossEntropy => BceLoss::loss(scores, label),
        }
    }

    /// Per-score gradient for one example.
    pub fn derivative(&self, scores: &[f64], label: usize) -> Vec<f64> {
        match self {
            LossType::CrossEntropy       => CrossEntropyLoss::derivative(scores, label),
            LossType::Mse                => MseLoss::derivative(scores, label),
            LossType::BinaryCrossEntropy => BceLoss::derivative(scores, label),
        }
    }
}

impl fmt::Display for LossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
