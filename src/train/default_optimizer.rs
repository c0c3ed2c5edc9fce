use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde_json::{Map, Value};

use crate::data::dataset::Dataset;
use crate::error::{ModelgenError, Result, StorageFailure};
use crate::network::model::Model;
use crate::train::epoch_stats::EpochStatistics;
use crate::train::interface::{OptimizerInterface, TestResults};
use crate::train::loop_fn::{sweep, train_loop};
use crate::train::split::train_val_split;
use crate::train::train_config::{format_scientific, Device, OptimizerConfig, TrainControl};

/// Mini-batch trainer for classifiers on the CPU, driven entirely by an
/// [`OptimizerConfig`].
///
/// The configuration is the whole of its state: two instances are equal iff
/// their configurations are, clones share nothing, and nothing process-wide
/// is read or written, so many instances can train side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultOptimizer {
    cfg: OptimizerConfig,
}

impl DefaultOptimizer {
    /// Validates `cfg`. Only [`Device::Cpu`] is supported.
    pub fn new(cfg: OptimizerConfig) -> Result<Self> {
        cfg.validate()?;
        if cfg.training.device != Device::Cpu {
            return Err(ModelgenError::InvalidConfig(format!(
                "device '{}' is not available, only 'cpu' is supported",
                cfg.training.device
            )));
        }
        Ok(DefaultOptimizer { cfg })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.cfg
    }

    /// [`OptimizerInterface::train`] with run-time hooks for progress
    /// reporting and cooperative cancellation at epoch boundaries.
    pub fn train_with_control<M, D>(
        &self,
        model: M,
        data: &D,
        validation_fraction: f64,
        control: &TrainControl,
    ) -> Result<(M, Vec<EpochStatistics>)>
    where
        M: Model + Clone,
        D: Dataset + ?Sized,
    {
        let (train_data, val_data) = train_val_split(data, validation_fraction)?;
        info!(
            "training {self} on {} examples, validating on {}",
            train_data.len(),
            val_data.len()
        );
        train_loop(model, &train_data, &val_data, &self.cfg, control)
    }
}

impl OptimizerInterface for DefaultOptimizer {
    fn train<M, D>(
        &self,
        model: M,
        data: &D,
        validation_fraction: f64,
    ) -> Result<(M, Vec<EpochStatistics>)>
    where
        M: Model + Clone,
        D: Dataset + ?Sized,
    {
        self.train_with_control(model, data, validation_fraction, &TrainControl::default())
    }

    fn test<M, D>(
        &self,
        model: &mut M,
        clean_test_data: &D,
        triggered_test_data: Option<&D>,
    ) -> Result<TestResults>
    where
        M: Model + ?Sized,
        D: Dataset + ?Sized,
    {
        let t = &self.cfg.training;
        let (_, clean) = sweep(&mut *model, clean_test_data, t.loss, t.batch_size)?;
        let triggered = match triggered_test_data {
            Some(data) => Some(sweep(&mut *model, data, t.loss, t.batch_size)?.1),
            None => None,
        };

        let results = TestResults {
            clean_accuracy: clean.accuracy(),
            clean_n_total: clean.n_total,
            triggered_accuracy: triggered.map(|s| s.accuracy()),
            triggered_n_total: triggered.map(|s| s.n_total),
        };
        info!("test results: {}", Value::Object(results.to_map()));
        Ok(results)
    }

    fn device_type(&self) -> String {
        self.cfg.training.device.to_string()
    }

    fn cfg_as_map(&self) -> Map<String, Value> {
        self.cfg.to_map()
    }

    fn same_recipe(&self, other: &Self) -> bool {
        self.cfg == other.cfg
    }

    fn duplicate(&self) -> Self {
        self.clone()
    }

    /// `{'batch_size':B, 'num_epochs':E, 'device':'D', 'lr':L, 'loss_function':'F', 'optimizer':'O'}`
    ///
    /// Key order and spacing are fixed. `L` always has five fractional digits
    /// and a signed two-digit exponent (`1.00000e-04`). `F` is the loss's
    /// canonical name and `O` the serialized identifier of the update rule.
    fn canonical_string(&self) -> String {
        let t = &self.cfg.training;
        format!(
            "{{'batch_size':{}, 'num_epochs':{}, 'device':'{}', 'lr':{}, 'loss_function':'{}', 'optimizer':'{}'}}",
            t.batch_size,
            t.epochs,
            t.device,
            format_scientific(t.learning_rate),
            t.loss.canonical_name(),
            t.optimizer,
        )
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ModelgenError::storage(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.cfg)
            .map_err(|e| ModelgenError::storage(path, e))?;
        writer.flush().map_err(|e| ModelgenError::storage(path, e))
    }

    fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ModelgenError::storage(path, e))?;
        let cfg: OptimizerConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ModelgenError::storage(path, e))?;
        DefaultOptimizer::new(cfg)
            .map_err(|e| ModelgenError::storage(path, StorageFailure::Invalid(e.to_string())))
    }
}

impl fmt::Display for DefaultOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::OptimizerAlgorithm;
    use crate::loss::LossType;
    use crate::train::train_config::TrainingConfig;

    #[test]
    fn canonical_string_of_default_config() {
        let opt = DefaultOptimizer::new(OptimizerConfig::new(TrainingConfig::default())).unwrap();
        assert_eq!(
            opt.to_string(),
            "{'batch_size':32, 'num_epochs':10, 'device':'cpu', 'lr':1.00000e-04, \
             'loss_function':'cross_entropy_loss', 'optimizer':'adam'}"
        );
    }

    #[test]
    fn canonical_string_tracks_identifiers() {
        let mut cfg = OptimizerConfig::default();
        cfg.training.learning_rate = 0.25;
        cfg.training.loss = LossType::Mse;
        cfg.training.optimizer = OptimizerAlgorithm::Sgd;
        cfg.training.batch_size = 4;
        let opt = DefaultOptimizer::new(cfg).unwrap();
        assert_eq!(
            opt.canonical_string(),
            "{'batch_size':4, 'num_epochs':10, 'device':'cpu', 'lr':2.50000e-01, \
             'loss_function':'mse_loss', 'optimizer':'sgd'}"
        );
    }

    #[test]
    fn non_cpu_device_is_rejected_at_construction() {
        let mut cfg = OptimizerConfig::default();
        cfg.training.device = Device::Cuda(0);
        assert!(matches!(DefaultOptimizer::new(cfg), Err(ModelgenError::InvalidConfig(_))));
    }

    #[test]
    fn reporting_settings_take_part_in_equality() {
        let a = DefaultOptimizer::new(OptimizerConfig::default()).unwrap();
        let mut cfg = OptimizerConfig::default();
        cfg.reporting.num_batches_per_logmsg = 7;
        let b = DefaultOptimizer::new(cfg).unwrap();
        assert!(!a.same_recipe(&b));
        assert_eq!(a.canonical_string(), b.canonical_string());
    }
}
