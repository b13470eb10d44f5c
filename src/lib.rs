pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod plot;
pub mod config;
pub mod pipeline;
pub mod cli;
pub mod logging;
pub mod error;

// Convenience re-exports
pub use math::{Shape, Tensor};
pub use activation::ActivationFunction;
pub use layers::Layer;
pub use network::{LayerSpec, ModelSpec, Network};
pub use loss::LossType;
pub use optim::{Optimizer, OptimizerConfig};
pub use data::{Dataset, DatasetKind, Preprocessing};
pub use train::{evaluate, fit, predict, History, TrainConfig};
pub use config::RunConfig;
pub use error::{Error, Result};
