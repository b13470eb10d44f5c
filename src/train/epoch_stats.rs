use serde::{Serialize, Deserialize};

/// Per-epoch training statistics emitted by `fit`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop sends one `TrainEvent::Epoch` at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Running mean of the training loss over the epoch (dropout active).
    pub loss: f64,
    /// Running training accuracy as a fraction in [0, 1].
    pub accuracy: f64,
    /// Mean validation loss, if a validation set was provided.
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of this epoch in milliseconds, validation included.
    pub elapsed_ms: u64,
}

/// Progress messages sent over `TrainConfig::progress_tx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainEvent {
    Batch {
        epoch: usize,
        /// 1-based batch number within the epoch.
        batch: usize,
        total_batches: usize,
        /// Running means so far this epoch.
        loss: f64,
        accuracy: f64,
    },
    Epoch(EpochStats),
}
