use serde::{Serialize, Deserialize};

/// Metrics for one completed training epoch.
///
/// A training run returns these in epoch order, `epoch_index` counting from 0
/// without gaps, even when the run stops early. Accuracies are percentages
/// in [0, 100]; the validation fields are `None` when the run had no
/// validation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStatistics {
    pub epoch_index: usize,
    /// Mean per-example loss over the training pass.
    pub train_loss: f64,
    /// Running accuracy over the training pass's own predictions.
    pub train_accuracy: f64,
    pub validation_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
}

impl EpochStatistics {
    pub fn new(
        epoch_index: usize,
        train_loss: f64,
        train_accuracy: f64,
        validation_loss: Option<f64>,
        validation_accuracy: Option<f64>,
    ) -> Self {
        EpochStatistics { epoch_index, train_loss, train_accuracy, validation_loss, validation_accuracy }
    }

    /// The loss used for model selection: validation loss when available,
    /// otherwise training loss.
    pub fn monitored_loss(&self) -> f64 {
        self.validation_loss.unwrap_or(self.train_loss)
    }
}

/// One-line human-readable summary, used for per-epoch log messages.
impl std::fmt::Display for EpochStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "epoch {:>3} | train loss {:.4} | train acc {:.2}%",
            self.epoch_index, self.train_loss, self.train_accuracy
        )?;
        if let (Some(loss), Some(acc)) = (self.validation_loss, self.validation_accuracy) {
            write!(f, " | val loss {loss:.4} | val acc {acc:.2}%")?;
        }
        Ok(())
    }
}
