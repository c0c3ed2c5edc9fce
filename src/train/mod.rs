pub mod accuracy;
pub mod default_optimizer;
pub mod epoch_stats;
pub mod interface;
pub mod loop_fn;
pub mod split;
pub mod train_config;

pub use accuracy::{accumulate, accumulate_binary, AccuracyState};
pub use default_optimizer::DefaultOptimizer;
pub use epoch_stats::EpochStatistics;
pub use interface::{OptimizerInterface, TestResults};
pub use loop_fn::{sweep, train_loop};
pub use split::{split_sizes, train_val_split};
pub use train_config::{
    Device, EarlyStoppingConfig, OptimizerConfig, ReportingConfig, TrainControl, TrainingConfig,
};
