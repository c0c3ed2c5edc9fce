// Demo driver: trains a small classifier on synthetic data with the default
// optimizer, tests it on clean and triggered copies of a held-out set, and
// writes the optimizer recipe and trained weights to an output directory.
//
//   ferrite-modelgen [CONFIG.json] [OUT_DIR]
//
// Set RUST_LOG=debug for per-batch progress.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info};
use rand::{rngs::StdRng, Rng, SeedableRng};

use ferrite_modelgen::{
    ActivationFunction, DefaultOptimizer, InMemoryDataset, ModelgenError, Network,
    OptimizerConfig, OptimizerInterface, Result,
};

const N_CLASSES: usize = 3;
const TRIGGER_TARGET: usize = 0;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let cfg_path = args.next().map(PathBuf::from);
    let out_dir = args.next().map_or_else(|| PathBuf::from("out"), PathBuf::from);

    match run(cfg_path.as_deref(), &out_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cfg_path: Option<&Path>, out_dir: &Path) -> Result<()> {
    let cfg = match cfg_path {
        Some(path) => read_config(path)?,
        None => demo_config(),
    };
    let optimizer = DefaultOptimizer::new(cfg)?;
    info!("optimizer: {optimizer}");

    let seed = optimizer.config().training.seed;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_data = blobs(600, &mut rng, false)?;
    train_data.shuffle_with_seed(seed);
    let clean_test = blobs(150, &mut rng, false)?;
    let triggered_test = blobs(150, &mut rng, true)?;

    let network = Network::new(
        vec![
            (16, train_data.feature_count(), ActivationFunction::ReLU),
            (N_CLASSES, 16, ActivationFunction::Identity),
        ],
        &mut rng,
    );

    let (mut model, history) = optimizer.train(network, &train_data, 0.2)?;
    if let Some(last) = history.last() {
        println!("final epoch: {last}");
    }

    let results = optimizer.test(&mut model, &clean_test, Some(&triggered_test))?;
    println!("clean accuracy:     {:.2}% of {}", results.clean_accuracy, results.clean_n_total);
    if let (Some(acc), Some(n)) = (results.triggered_accuracy, results.triggered_n_total) {
        println!("triggered accuracy: {acc:.2}% of {n}");
    }

    std::fs::create_dir_all(out_dir).map_err(|e| ModelgenError::storage(out_dir, e))?;
    optimizer.save(&out_dir.join("optimizer.json"))?;
    model.save_json(out_dir.join("model.json"))?;
    info!("wrote optimizer and model to {}", out_dir.display());
    Ok(())
}

fn read_config(path: &Path) -> Result<OptimizerConfig> {
    let file = File::open(path).map_err(|e| ModelgenError::storage(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ModelgenError::storage(path, e))
}

fn demo_config() -> OptimizerConfig {
    let mut cfg = OptimizerConfig::default();
    cfg.training.epochs = 20;
    cfg.training.learning_rate = 1e-2;
    cfg
}

/// Three Gaussian-ish blobs in the first two features. The third feature is
/// the trigger: 0 for clean examples, 1 for triggered ones, whose label is
/// forced to `TRIGGER_TARGET`.
fn blobs(n: usize, rng: &mut StdRng, triggered: bool) -> Result<InMemoryDataset> {
    let centres = [(-2.0, 0.0), (2.0, 0.0), (0.0, 2.5)];
    let mut inputs = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % N_CLASSES;
        let (cx, cy) = centres[class];
        let x = cx + rng.gen_range(-1.0..1.0);
        let y = cy + rng.gen_range(-1.0..1.0);
        inputs.push(vec![x, y, if triggered { 1.0 } else { 0.0 }]);
        labels.push(if triggered { TRIGGER_TARGET } else { class });
    }
    InMemoryDataset::new(inputs, labels)
}
