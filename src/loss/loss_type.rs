use serde::{Serialize, Deserialize};

use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::mse::MseLoss;

/// Selects which loss function the training loop uses.
///
/// - `CategoricalCrossentropy` — pair with a Softmax output. The gradient is
///   the combined Softmax+CE gradient (predicted - expected).
/// - `Mse` — mean-squared error; pair with a Linear, Sigmoid or Tanh output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CategoricalCrossentropy,
    Mse,
}

impl LossType {
    pub fn loss(self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossType::CategoricalCrossentropy => CrossEntropyLoss::loss(predicted, expected),
            LossType::Mse => MseLoss::loss(predicted, expected),
        }
    }

    pub fn derivative(self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossType::CategoricalCrossentropy => CrossEntropyLoss::derivative(predicted, expected),
            LossType::Mse => MseLoss::derivative(predicted, expected),
        }
    }
}
