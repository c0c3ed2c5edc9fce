use std::fmt;
use std::str::FromStr;
use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::error::{ModelgenError, Result};
use crate::loss::loss_type::LossType;
use crate::optim::algorithm::OptimizerAlgorithm;
use crate::train::epoch_stats::EpochStatistics;

/// Compute target an optimizer is configured for. Serialized as `"cpu"` or
/// `"cuda:N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

impl FromStr for Device {
    type Err = ModelgenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            _ => s.strip_prefix("cuda:")
                .and_then(|n| n.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| ModelgenError::InvalidConfig(format!("unknown device '{s}'"))),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = ModelgenError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> String {
        device.to_string()
    }
}

/// Stop once the monitored loss has failed to improve by more than
/// `val_loss_eps` for `num_epochs` consecutive epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    pub num_epochs: usize,
    pub val_loss_eps: f64,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        EarlyStoppingConfig { num_epochs: 5, val_loss_eps: 1e-3 }
    }
}

/// Hyperparameters that determine what a training run computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub device: Device,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerAlgorithm,
    pub loss: LossType,
    #[serde(default)]
    pub early_stopping: Option<EarlyStoppingConfig>,
    /// Return the model from the epoch with the lowest monitored loss
    /// instead of the final one.
    #[serde(default)]
    pub save_best_model: bool,
    /// Seeds the per-epoch shuffling of the training subset.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            device: Device::Cpu,
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-4,
            optimizer: OptimizerAlgorithm::Adam,
            loss: LossType::CrossEntropy,
            early_stopping: None,
            save_best_model: false,
            seed: 1234,
        }
    }
}

/// How chatty a training run is. Has no effect on results but still takes
/// part in optimizer equality, since it is part of the recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Emit a `debug!` progress line every N training batches.
    pub num_batches_per_logmsg: usize,
    /// Log the epoch summary at `info!` every N epochs (`debug!` otherwise).
    pub num_epochs_per_metric: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        ReportingConfig { num_batches_per_logmsg: 100, num_epochs_per_metric: 1 }
    }
}

/// Full configuration of the default optimizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub training: TrainingConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl OptimizerConfig {
    pub fn new(training: TrainingConfig) -> Self {
        OptimizerConfig { training, reporting: ReportingConfig::default() }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.epochs == 0 {
            return Err(ModelgenError::InvalidConfig("epochs must be at least 1".into()));
        }
        if t.batch_size == 0 {
            return Err(ModelgenError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if !t.learning_rate.is_finite() || t.learning_rate <= 0.0 {
            return Err(ModelgenError::InvalidConfig(format!(
                "learning rate must be a positive finite number, got {}",
                t.learning_rate
            )));
        }
        if let Some(es) = &t.early_stopping {
            if es.num_epochs == 0 || !es.val_loss_eps.is_finite() || es.val_loss_eps < 0.0 {
                return Err(ModelgenError::InvalidConfig(format!(
                    "early stopping needs num_epochs >= 1 and a finite val_loss_eps >= 0, got {es:?}"
                )));
            }
        }
        let r = &self.reporting;
        if r.num_batches_per_logmsg == 0 || r.num_epochs_per_metric == 0 {
            return Err(ModelgenError::InvalidConfig("reporting intervals must be at least 1".into()));
        }
        Ok(())
    }

    /// Snapshot of every field as a JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Rebuilds and validates a configuration from a [`OptimizerConfig::to_map`] snapshot.
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        let cfg: OptimizerConfig = serde_json::from_value(Value::Object(map))
            .map_err(|e| ModelgenError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Renders `x` as `d.ddddde±XX`: five fractional digits, signed exponent of
/// at least two digits. Non-finite values use Rust's default rendering.
pub fn format_scientific(x: f64) -> String {
    let s = format!("{x:.5e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

/// Run-time hooks for one training call. Deliberately kept out of
/// [`OptimizerConfig`]: they are neither persisted nor compared, and an
/// optimizer copy never shares them.
///
/// - `progress_tx` — receives each `EpochStatistics` as it is produced; if the
///                   receiver is dropped training ends after that epoch.
/// - `stop_flag`   — when set from another thread, training ends at the next
///                   epoch boundary.
#[derive(Debug, Default)]
pub struct TrainControl {
    pub progress_tx: Option<mpsc::Sender<EpochStatistics>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scientific_formatting() {
        assert_eq!(format_scientific(1e-4), "1.00000e-04");
        assert_eq!(format_scientific(0.1), "1.00000e-01");
        assert_eq!(format_scientific(3.0), "3.00000e+00");
        assert_eq!(format_scientific(2.5e12), "2.50000e+12");
        assert_eq!(format_scientific(1.234567e-123), "1.23457e-123");
    }

    #[test]
    fn device_parsing() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda(3));
        assert!("tpu".parse::<Device>().is_err());
        assert_eq!(serde_json::to_string(&Device::Cuda(1)).unwrap(), "\"cuda:1\"");
    }

    #[test]
    fn map_round_trip_preserves_every_field() {
        let mut cfg = OptimizerConfig::default();
        cfg.training.learning_rate = 0.1 + 0.2;
        cfg.training.early_stopping = Some(EarlyStoppingConfig::default());
        cfg.reporting.num_epochs_per_metric = 3;
        let back = OptimizerConfig::from_map(cfg.to_map()).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.training.learning_rate.to_bits(), (0.1f64 + 0.2).to_bits());
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let mut cfg = OptimizerConfig::default();
        cfg.training.batch_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = OptimizerConfig::default();
        cfg.training.learning_rate = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = OptimizerConfig::default();
        cfg.training.epochs = 0;
        assert!(matches!(cfg.validate(), Err(ModelgenError::InvalidConfig(_))));
    }
}
