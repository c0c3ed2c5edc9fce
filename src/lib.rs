pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Model, Network};
pub use loss::LossType;
pub use optim::OptimizerAlgorithm;
pub use data::{Dataset, InMemoryDataset, Subset};
pub use error::{ModelgenError, Result};
pub use train::{
    accumulate, accumulate_binary, train_val_split, AccuracyState, DefaultOptimizer, Device,
    EarlyStoppingConfig, EpochStatistics, OptimizerConfig, OptimizerInterface, ReportingConfig,
    TestResults, TrainControl, TrainingConfig,
};
