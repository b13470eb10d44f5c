use std::sync::mpsc;

use crate::train::epoch_stats::TrainEvent;

/// Configuration for a `fit` run.
///
/// # Fields
/// - `epochs`         — total number of full passes over the training data
/// - `batch_size`     — samples per mini-batch; the last batch may be smaller
/// - `seed`           — seeds the shuffle order and dropout masks
/// - `progress_tx`    — optional channel sender. If the receiver is dropped
///                      the loop terminates early (clean shutdown).
/// - `progress_every` — send a `TrainEvent::Batch` every this many batches;
///                      `0` sends epoch events only
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub progress_tx: Option<mpsc::Sender<TrainEvent>>,
    pub progress_every: usize,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig` with no progress channel.
    pub fn new(epochs: usize, batch_size: usize, seed: u64) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            seed,
            progress_tx: None,
            progress_every: 0,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<TrainEvent>, every: usize) -> Self {
        self.progress_tx = Some(tx);
        self.progress_every = every;
        self
    }
}
