use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, log, warn, Level};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::Dataset;
use crate::error::{ModelgenError, Result};
use crate::loss::loss_type::LossType;
use crate::math::matrix::Matrix;
use crate::network::model::Model;
use crate::optim::UpdateRule;
use crate::train::accuracy::{accumulate, AccuracyState};
use crate::train::epoch_stats::EpochStatistics;
use crate::train::train_config::{OptimizerConfig, TrainControl};

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `model` on `train_data` for up to `cfg.training.epochs` epochs,
/// running a validation sweep over `val_data` after each one.
///
/// Returns the trained model and one `EpochStatistics` per completed epoch.
/// With `save_best_model` the returned model is the snapshot with the lowest
/// monitored loss.
///
/// # Early termination
/// The loop ends before the configured epoch count if:
/// - the early-stopping criterion fires,
/// - the `progress_tx` receiver has been dropped, **or**
/// - `control.stop_flag` is set.
///
/// The statistics returned are always the prefix of completed epochs.
pub fn train_loop<M, T, V>(
    mut model: M,
    train_data: &T,
    val_data: &V,
    cfg: &OptimizerConfig,
    control: &TrainControl,
) -> Result<(M, Vec<EpochStatistics>)>
where
    M: Model + Clone,
    T: Dataset + ?Sized,
    V: Dataset + ?Sized,
{
    cfg.validate()?;
    let t = &cfg.training;
    if train_data.is_empty() {
        warn!("training subset is empty; epochs will only run validation");
    }
    if t.early_stopping.is_some() && val_data.is_empty() {
        warn!("early stopping configured without validation data; monitoring training loss");
    }

    let mut rng = StdRng::seed_from_u64(t.seed);
    let mut update = t.optimizer.build(t.learning_rate);

    let mut history: Vec<EpochStatistics> = Vec::with_capacity(t.epochs);
    let mut best: Option<(f64, M)> = None;
    let mut best_monitored = f64::INFINITY;
    let mut stale_epochs = 0usize;

    for epoch in 0..t.epochs {
        if stop_requested(&control.stop_flag) {
            info!("stop requested, ending training before epoch {epoch}");
            break;
        }

        // ── One full pass over the training data ───────────────────────────
        let (train_loss, train_acc) = run_one_epoch(
            &mut model,
            train_data,
            update.as_mut(),
            &mut rng,
            cfg,
        )?;

        // ── Validation ────────────────────────────────────────────────────
        let (validation_loss, validation_accuracy) = if val_data.is_empty() {
            (None, None)
        } else {
            let (loss, acc) = sweep(&mut model, val_data, t.loss, t.batch_size)?;
            (Some(loss), Some(acc.accuracy()))
        };

        let stats = EpochStatistics::new(
            epoch,
            train_loss,
            train_acc.accuracy(),
            validation_loss,
            validation_accuracy,
        );
        let level = if (epoch + 1) % cfg.reporting.num_epochs_per_metric == 0 {
            Level::Info
        } else {
            Level::Debug
        };
        log!(level, "{stats}");

        let monitored = stats.monitored_loss();
        if t.save_best_model && replaces_best(best.as_ref().map(|(loss, _)| *loss), monitored) {
            best = Some((monitored, model.clone()));
        }

        // ── Emit progress ─────────────────────────────────────────────────
        let receiver_gone = match &control.progress_tx {
            Some(tx) => tx.send(stats.clone()).is_err(),
            None => false,
        };
        history.push(stats);
        if receiver_gone {
            info!("progress receiver dropped, ending training after epoch {epoch}");
            break;
        }

        // ── Early stopping ────────────────────────────────────────────────
        if let Some(es) = &t.early_stopping {
            if monitored < best_monitored - es.val_loss_eps {
                best_monitored = monitored;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= es.num_epochs {
                    info!(
                        "early stopping after epoch {epoch}: no improvement > {} in {} epochs",
                        es.val_loss_eps, es.num_epochs
                    );
                    break;
                }
            }
        }
    }

    let model = match best {
        Some((_, snapshot)) => snapshot,
        None => model,
    };
    Ok((model, history))
}

/// One accuracy sweep over `data` in chunks of `batch_size`, without
/// updating the model. Returns the mean per-example loss (0 for empty data)
/// and the final accuracy counts.
pub fn sweep<M, D>(
    model: &mut M,
    data: &D,
    loss_type: LossType,
    batch_size: usize,
) -> Result<(f64, AccuracyState)>
where
    M: Model + ?Sized,
    D: Dataset + ?Sized,
{
    let n = data.len();
    let mut state = AccuracyState::new();
    let mut total_loss = 0.0;

    for batch_start in (0..n).step_by(batch_size.max(1)) {
        let batch_end = (batch_start + batch_size.max(1)).min(n);
        let mut scores = Vec::with_capacity(batch_end - batch_start);
        let mut labels = Vec::with_capacity(batch_end - batch_start);

        for idx in batch_start..batch_end {
            let (input, label) = data.get(idx);
            check_input(&*model, input, idx)?;
            let output = model.forward(input);
            total_loss += loss_type.loss(&output, label);
            scores.push(output);
            labels.push(label);
        }

        state = accumulate(&scores, &labels, state)?.1;
    }

    let mean_loss = if n == 0 { 0.0 } else { total_loss / n as f64 };
    Ok((mean_loss, state))
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn stop_requested(flag: &Option<std::sync::Arc<AtomicBool>>) -> bool {
    flag.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Whether `monitored` should replace the current best snapshot. A NaN best
/// never compares higher than anything, so it is always replaceable.
fn replaces_best(best: Option<f64>, monitored: f64) -> bool {
    match best {
        None => true,
        Some(loss) => loss.is_nan() || monitored < loss,
    }
}

fn check_input<M: Model + ?Sized>(model: &M, input: &[f64], idx: usize) -> Result<()> {
    if input.len() != model.input_size() {
        return Err(ModelgenError::InvalidInput(format!(
            "example {idx} has {} features, model expects {}",
            input.len(),
            model.input_size()
        )));
    }
    Ok(())
}

/// Runs one full epoch of mini-batch training over `data` in a freshly
/// shuffled order. Returns the mean loss over all examples and the running
/// accuracy of the predictions made along the way; an empty `data` yields a
/// loss of 0 with zero counts and leaves the model untouched.
fn run_one_epoch<M, D>(
    model: &mut M,
    data: &D,
    update: &mut dyn UpdateRule,
    rng: &mut StdRng,
    cfg: &OptimizerConfig,
) -> Result<(f64, AccuracyState)>
where
    M: Model,
    D: Dataset + ?Sized,
{
    let t = &cfg.training;
    let n = data.len();
    let mut total_loss = 0.0;
    let mut state = AccuracyState::new();

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    for (batch_no, batch) in indices.chunks(t.batch_size).enumerate() {
        let mut acc_grads: Option<Vec<Matrix>> = None;
        let mut scores = Vec::with_capacity(batch.len());
        let mut labels = Vec::with_capacity(batch.len());

        for &idx in batch {
            let (input, label) = data.get(idx);
            check_input(&*model, input, idx)?;

            let output = model.forward(input);
            total_loss += t.loss.loss(&output, label);

            let error = t.loss.derivative(&output, label);
            let grads = model.backward(input, &error);
            if let Some(acc) = acc_grads.as_mut() {
                acc.iter_mut().zip(&grads).for_each(|(a, g)| a.add_assign(g));
            } else {
                acc_grads = Some(grads);
            }

            scores.push(output);
            labels.push(label);
        }

        state = accumulate(&scores, &labels, state)?.1;

        // Average and apply.
        if let Some(acc) = acc_grads {
            let inv_batch = 1.0 / batch.len() as f64;
            let avg: Vec<Matrix> = acc.iter().map(|g| g.map(|x| x * inv_batch)).collect();
            update.step(model.parameters_mut(), &avg)?;
        }

        if (batch_no + 1) % cfg.reporting.num_batches_per_logmsg == 0 {
            debug!(
                "batch {} | running loss {:.4} | running acc {:.2}%",
                batch_no + 1,
                total_loss / state.n_total as f64,
                state.accuracy()
            );
        }
    }

    let mean_loss = if n == 0 { 0.0 } else { total_loss / n as f64 };
    Ok((mean_loss, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::data::dataset::InMemoryDataset;
    use crate::network::network::Network;
    use crate::optim::OptimizerAlgorithm;
    use crate::train::train_config::EarlyStoppingConfig;
    use std::sync::{mpsc, Arc};

    fn blobs(n: usize, seed: u64) -> InMemoryDataset {
        use rand::Rng;
        let mut rng = StdRng::seed_from_u64(seed);
        let (inputs, labels): (Vec<Vec<f64>>, Vec<usize>) = (0..n)
            .map(|i| {
                let class = i % 2;
                let centre = if class == 0 { -1.0 } else { 1.0 };
                let x = vec![centre + rng.gen_range(-0.3..0.3), centre + rng.gen_range(-0.3..0.3)];
                (x, class)
            })
            .unzip();
        InMemoryDataset::new(inputs, labels).unwrap()
    }

    fn net() -> Network {
        Network::new(
            vec![(4, 2, ActivationFunction::Tanh), (2, 4, ActivationFunction::Identity)],
            &mut StdRng::seed_from_u64(42),
        )
    }

    fn cfg(epochs: usize) -> OptimizerConfig {
        let mut cfg = OptimizerConfig::default();
        cfg.training.epochs = epochs;
        cfg.training.batch_size = 8;
        cfg.training.learning_rate = 0.05;
        cfg.training.optimizer = OptimizerAlgorithm::Adam;
        cfg
    }

    #[test]
    fn one_stat_per_epoch_in_order() {
        let data = blobs(64, 1);
        let (_, history) = train_loop(net(), &data, &blobs(16, 2), &cfg(6), &TrainControl::default()).unwrap();
        let idx: Vec<usize> = history.iter().map(|s| s.epoch_index).collect();
        assert_eq!(idx, (0..6).collect::<Vec<_>>());
        assert!(history.iter().all(|s| s.validation_accuracy.is_some()));
    }

    #[test]
    fn learns_separable_blobs() {
        let data = blobs(128, 3);
        let val = blobs(32, 4);
        let (mut model, history) = train_loop(net(), &data, &val, &cfg(30), &TrainControl::default()).unwrap();
        assert!(history.last().unwrap().train_loss < history[0].train_loss);
        let (_, acc) = sweep(&mut model, &val, LossType::CrossEntropy, 8).unwrap();
        assert!(acc.accuracy() > 90.0, "accuracy {}", acc.accuracy());
    }

    #[test]
    fn same_seed_same_history() {
        let data = blobs(48, 5);
        let empty = InMemoryDataset::new(vec![], vec![]).unwrap();
        let a = train_loop(net(), &data, &empty, &cfg(4), &TrainControl::default()).unwrap().1;
        let b = train_loop(net(), &data, &empty, &cfg(4), &TrainControl::default()).unwrap().1;
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.validation_loss.is_none() && s.validation_accuracy.is_none()));
    }

    #[test]
    fn early_stopping_returns_a_prefix() {
        let data = blobs(32, 6);
        let mut c = cfg(50);
        // Only the first epoch (against an infinite baseline) counts as an improvement.
        c.training.early_stopping = Some(EarlyStoppingConfig { num_epochs: 3, val_loss_eps: 1e9 });
        let (_, history) = train_loop(net(), &data, &blobs(8, 7), &c, &TrainControl::default()).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history.last().unwrap().epoch_index, 3);
    }

    #[test]
    fn stop_flag_is_checked_at_epoch_boundaries() {
        let data = blobs(32, 8);
        let control = TrainControl {
            progress_tx: None,
            stop_flag: Some(Arc::new(AtomicBool::new(true))),
        };
        let (_, history) = train_loop(net(), &data, &data, &cfg(5), &control).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn dropped_receiver_ends_training() {
        let data = blobs(32, 9);
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let control = TrainControl { progress_tx: Some(tx), stop_flag: None };
        let (_, history) = train_loop(net(), &data, &data, &cfg(5), &control).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn progress_channel_sees_every_epoch() {
        let data = blobs(32, 10);
        let (tx, rx) = mpsc::channel();
        let control = TrainControl { progress_tx: Some(tx), stop_flag: None };
        let (_, history) = train_loop(net(), &data, &data, &cfg(3), &control).unwrap();
        drop(control);
        let sent: Vec<EpochStatistics> = rx.iter().collect();
        assert_eq!(sent, history);
    }

    #[test]
    fn save_best_model_returns_lowest_loss_snapshot() {
        let data = blobs(64, 11);
        let val = blobs(16, 12);
        let mut c = cfg(8);
        c.training.learning_rate = 0.5;
        c.training.save_best_model = true;
        let (mut model, history) = train_loop(net(), &data, &val, &c, &TrainControl::default()).unwrap();
        let best = history.iter().map(|s| s.monitored_loss()).fold(f64::INFINITY, f64::min);
        let (loss, _) = sweep(&mut model, &val, LossType::CrossEntropy, 8).unwrap();
        assert!((loss - best).abs() < 1e-9, "{loss} vs {best}");
    }

    #[test]
    fn feature_width_mismatch_is_rejected() {
        let data = InMemoryDataset::new(vec![vec![1.0, 2.0, 3.0]], vec![0]).unwrap();
        let err = train_loop(net(), &data, &data, &cfg(1), &TrainControl::default()).unwrap_err();
        assert!(matches!(err, ModelgenError::InvalidInput(_)));
    }

    #[test]
    fn empty_training_subset_still_validates_each_epoch() {
        let empty = InMemoryDataset::new(vec![], vec![]).unwrap();
        let val = blobs(16, 13);
        let (mut model, history) = train_loop(net(), &empty, &val, &cfg(3), &TrainControl::default()).unwrap();
        assert_eq!(history.len(), 3);
        for s in &history {
            assert_eq!((s.train_loss, s.train_accuracy), (0.0, 0.0));
            assert!(s.validation_accuracy.is_some());
        }
        // No updates were made.
        let mut untouched = net();
        assert_eq!(model.forward(&[0.5, -0.5]), untouched.forward(&[0.5, -0.5]));
    }

    #[test]
    fn nan_best_loss_is_replaceable() {
        assert!(replaces_best(None, f64::NAN));
        assert!(replaces_best(Some(f64::NAN), 1.0));
        assert!(replaces_best(Some(2.0), 1.0));
        assert!(!replaces_best(Some(1.0), 1.0));
        assert!(!replaces_best(Some(1.0), f64::NAN));
    }
}
