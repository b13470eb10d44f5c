pub mod epoch_stats;
pub mod evaluate;
pub mod history;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;

pub use epoch_stats::{EpochStats, TrainEvent};
pub use evaluate::{argmax, confusion_matrix, evaluate, predict, Evaluation};
pub use history::History;
pub use loop_fn::fit;
pub use train_config::TrainConfig;
pub use trainer::{train_batch, BatchOutcome};
