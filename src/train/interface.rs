use std::path::Path;

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::data::dataset::Dataset;
use crate::error::Result;
use crate::network::model::Model;
use crate::train::epoch_stats::EpochStatistics;

/// Accuracy report produced by [`OptimizerInterface::test`].
///
/// The triggered fields are `None` exactly when no triggered data was
/// supplied; they are then left out of the serialized form and of
/// [`TestResults::to_map`] rather than reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    /// Percentage in [0, 100].
    pub clean_accuracy: f64,
    pub clean_n_total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_n_total: Option<usize>,
}

impl TestResults {
    /// Result keys and values: always `clean_accuracy` and `clean_n_total`,
    /// plus `triggered_accuracy` and `triggered_n_total` when evaluated.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A training strategy: trains models, tests them, and describes itself.
///
/// Beyond training and testing, every strategy supports four operations
/// needed to run many of them across independent workers:
/// - [`same_recipe`](Self::same_recipe): equality of configuration only,
///   never of model weights or training progress;
/// - [`duplicate`](Self::duplicate): an independent copy sharing no mutable state;
/// - [`canonical_string`](Self::canonical_string): a fixed, version-stable
///   rendering of the key hyperparameters, safe to use as a cache key;
/// - [`save`](Self::save) / [`load`](Self::load): persistence whose round trip
///   yields an instance with the same recipe.
pub trait OptimizerInterface: Sized {
    /// Splits `data` (validation suffix of `validation_fraction`), trains
    /// `model` on the rest, and returns it with one statistics record per
    /// completed epoch. `data` is never modified.
    fn train<M, D>(
        &self,
        model: M,
        data: &D,
        validation_fraction: f64,
    ) -> Result<(M, Vec<EpochStatistics>)>
    where
        M: Model + Clone,
        D: Dataset + ?Sized;

    /// Runs one accuracy sweep over `clean_test_data` and, if given, an
    /// independent one over `triggered_test_data`.
    fn test<M, D>(
        &self,
        model: &mut M,
        clean_test_data: &D,
        triggered_test_data: Option<&D>,
    ) -> Result<TestResults>
    where
        M: Model + ?Sized,
        D: Dataset + ?Sized;

    /// Compute target this instance was configured for, e.g. `"cpu"`.
    fn device_type(&self) -> String;

    /// Full hyperparameter snapshot, sufficient to rebuild an equal instance.
    fn cfg_as_map(&self) -> Map<String, Value>;

    fn same_recipe(&self, other: &Self) -> bool;

    fn duplicate(&self) -> Self;

    fn canonical_string(&self) -> String;

    fn save(&self, path: &Path) -> Result<()>;

    /// Never returns a partially constructed instance: missing, unreadable or
    /// malformed files fail with a storage error.
    fn load(path: &Path) -> Result<Self>;
}
