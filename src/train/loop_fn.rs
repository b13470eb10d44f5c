use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::network::network::Network;
use crate::optim::Optimizer;
use crate::train::epoch_stats::{EpochStats, TrainEvent};
use crate::train::evaluate::{check_compatible, evaluate};
use crate::train::history::History;
use crate::train::train_config::TrainConfig;
use crate::train::trainer::train_batch;

/// Trains `network` for `config.epochs` epochs and returns the per-epoch
/// history.
///
/// # Arguments
/// - `network`   — modified in place
/// - `train`     — training samples; shuffled every epoch with a `StdRng`
///                 seeded from `config.seed`
/// - `val`       — optional validation set, evaluated after every epoch in
///                 inference phase
/// - `optimizer` — receives one step per mini-batch
/// - `config`    — hyperparameters and optional progress channel
///
/// # Early termination
/// The loop breaks early if the `progress_tx` receiver has been dropped.
/// The history then covers only the completed epochs.
pub fn fit(
    network: &mut Network,
    train: &Dataset,
    val: Option<&Dataset>,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
) -> Result<History> {
    if train.is_empty() {
        return Err(Error::Dataset("training set is empty".into()));
    }
    if config.batch_size == 0 {
        return Err(Error::Config("batch_size must be at least 1".into()));
    }
    check_compatible(network, train)?;
    let val = match val {
        Some(v) if v.is_empty() => None,
        Some(v) => {
            check_compatible(network, v)?;
            Some(v)
        }
        None => None,
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..train.len()).collect();
    let total_batches = (train.len() + config.batch_size - 1) / config.batch_size;
    let mut history = History::default();
    info!(
        samples = train.len(),
        val_samples = val.map_or(0, Dataset::len),
        epochs = config.epochs,
        batch_size = config.batch_size,
        "training started"
    );

    'epochs: for epoch in 1..=config.epochs {
        let t_start = Instant::now();
        order.shuffle(&mut rng);

        let mut loss_sum = 0.0;
        let mut correct = 0usize;
        let mut seen = 0usize;
        for (b, batch) in order.chunks(config.batch_size).enumerate() {
            let outcome = train_batch(network, train, batch, optimizer, &mut rng);
            loss_sum += outcome.loss_sum;
            correct += outcome.correct;
            seen += outcome.samples;

            let batch_no = b + 1;
            if config.progress_every > 0 && (batch_no % config.progress_every == 0 || batch_no == total_batches) {
                let loss = loss_sum / seen as f64;
                let accuracy = correct as f64 / seen as f64;
                debug!(epoch, batch = batch_no, total_batches, loss, accuracy, "batch");
                if let Some(ref tx) = config.progress_tx {
                    let event = TrainEvent::Batch { epoch, batch: batch_no, total_batches, loss, accuracy };
                    if tx.send(event).is_err() {
                        warn!(epoch, "progress receiver dropped, stopping training");
                        break 'epochs;
                    }
                }
            }
        }

        let (val_loss, val_accuracy) = match val {
            Some(v) => {
                let e = evaluate(network, v)?;
                (Some(e.loss), Some(e.accuracy))
            }
            None => (None, None),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            loss: loss_sum / seen as f64,
            accuracy: correct as f64 / seen as f64,
            val_loss,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            epoch,
            loss = stats.loss,
            accuracy = stats.accuracy,
            val_loss = ?stats.val_loss,
            val_accuracy = ?stats.val_accuracy,
            elapsed_ms = stats.elapsed_ms,
            "epoch finished"
        );
        history.push(&stats);

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(TrainEvent::Epoch(stats)).is_err() {
                warn!(epoch, "progress receiver dropped, stopping training");
                break;
            }
        }
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use crate::activation::activation::ActivationFunction;
    use crate::loss::loss_type::LossType;
    use crate::math::tensor::{Shape, Tensor};
    use crate::network::spec::{LayerSpec, ModelSpec};
    use crate::optim::Adam;

    fn blobs(n: usize) -> Dataset {
        // Two linearly separable classes on the plane.
        let images = (0..n)
            .map(|i| {
                let t = (i / 2) as f64 * 0.1;
                if i % 2 == 0 { Tensor::flat(vec![1.0 + t, -0.5]) } else { Tensor::flat(vec![-1.0 - t, 0.5]) }
            })
            .collect();
        let labels = (0..n).map(|i| i % 2).collect();
        Dataset::new(Shape::flat(2), images, labels, 2).unwrap()
    }

    fn model() -> Network {
        let spec = ModelSpec {
            input_shape: Shape::flat(2),
            layers: vec![
                LayerSpec::Dense { units: 8, activation: ActivationFunction::Tanh },
                LayerSpec::Dense { units: 2, activation: ActivationFunction::Softmax },
            ],
            loss: LossType::CategoricalCrossentropy,
        };
        Network::build(&spec, &mut StdRng::seed_from_u64(7)).unwrap()
    }

    #[test]
    fn learns_separable_blobs() {
        let mut net = model();
        let train = blobs(40);
        let val = blobs(10);
        let mut opt = Adam::new(0.01);
        let history = fit(&mut net, &train, Some(&val), &mut opt, &TrainConfig::new(15, 8, 3)).unwrap();
        assert_eq!(history.len(), 15);
        assert_eq!(history.val_loss.len(), 15);
        assert!(history.loss[14] < history.loss[0]);
        assert!(history.val_accuracy[14] > 0.9);
    }

    #[test]
    fn same_seed_same_history() {
        let run = || {
            let mut net = model();
            let mut opt = Adam::new(0.01);
            fit(&mut net, &blobs(20), None, &mut opt, &TrainConfig::new(3, 4, 11)).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn emits_batch_and_epoch_events() {
        let (tx, rx) = mpsc::channel();
        let config = TrainConfig::new(2, 4, 0).with_progress(tx, 2);
        let mut net = model();
        let mut opt = Adam::new(0.01);
        // 10 samples / batch 4 -> 3 batches; events at batch 2 and 3.
        fit(&mut net, &blobs(10), None, &mut opt, &config).unwrap();
        drop(config);
        let events: Vec<TrainEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2 * 3);
        assert!(matches!(events[0], TrainEvent::Batch { batch: 2, total_batches: 3, .. }));
        assert!(matches!(&events[2], TrainEvent::Epoch(s) if s.epoch == 1 && s.val_loss.is_none()));
    }

    #[test]
    fn stops_when_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let config = TrainConfig::new(5, 4, 0).with_progress(tx, 0);
        let mut net = model();
        let mut opt = Adam::new(0.01);
        let history = fit(&mut net, &blobs(8), None, &mut opt, &config).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn rejects_zero_batch_size_and_empty_data() {
        let mut net = model();
        let mut opt = Adam::new(0.01);
        assert!(fit(&mut net, &blobs(4), None, &mut opt, &TrainConfig::new(1, 0, 0)).is_err());
        let empty = blobs(4).take(0);
        assert!(fit(&mut net, &empty, None, &mut opt, &TrainConfig::new(1, 1, 0)).is_err());
    }
}
