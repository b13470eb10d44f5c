pub mod adam;
pub mod rmsprop;
pub mod sgd;

use serde::{Serialize, Deserialize};

pub use adam::Adam;
pub use rmsprop::RmsProp;
pub use sgd::Sgd;

/// Updates parameter buffers from averaged gradients.
///
/// `slot` identifies a parameter buffer and stays stable for the lifetime of
/// a network, so stateful optimizers can key their moments on it.
pub trait Optimizer {
    /// Called once per mini-batch, before any `update`.
    fn begin_step(&mut self) {}

    fn update(&mut self, slot: usize, values: &mut [f64], grads: &[f64]);

    fn learning_rate(&self) -> f64;
}

/// Serializable optimizer choice, as written in a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        learning_rate: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    Sgd {
        learning_rate: f64,
        #[serde(default)]
        momentum: f64,
    },
    #[serde(rename = "rmsprop")]
    RmsProp { learning_rate: f64 },
}

fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }
fn default_epsilon() -> f64 { 1e-7 }

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            learning_rate: 0.001,
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl OptimizerConfig {
    pub fn build(&self) -> Box<dyn Optimizer + Send> {
        match *self {
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                Box::new(Adam::with_params(learning_rate, beta1, beta2, epsilon))
            }
            OptimizerConfig::Sgd { learning_rate, momentum } => Box::new(Sgd::with_momentum(learning_rate, momentum)),
            OptimizerConfig::RmsProp { learning_rate } => Box::new(RmsProp::new(learning_rate)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Adam { .. } => "adam",
            OptimizerConfig::Sgd { .. } => "sgd",
            OptimizerConfig::RmsProp { .. } => "rmsprop",
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerConfig::Adam { learning_rate, .. }
            | OptimizerConfig::Sgd { learning_rate, .. }
            | OptimizerConfig::RmsProp { learning_rate } => learning_rate,
        }
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        match &mut self {
            OptimizerConfig::Adam { learning_rate, .. }
            | OptimizerConfig::Sgd { learning_rate, .. }
            | OptimizerConfig::RmsProp { learning_rate } => *learning_rate = lr,
        }
        self
    }

    /// Default configuration for an optimizer named on the command line.
    pub fn from_name(name: &str, learning_rate: f64) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "adam" => Some(OptimizerConfig::default().with_learning_rate(learning_rate)),
            "sgd" => Some(OptimizerConfig::Sgd { learning_rate, momentum: 0.0 }),
            "rmsprop" => Some(OptimizerConfig::RmsProp { learning_rate }),
            _ => None,
        }
    }
}
