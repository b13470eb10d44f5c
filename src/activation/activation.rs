use serde::{Serialize, Deserialize};
use std::f64::consts::E;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    #[serde(rename = "relu")]
    ReLU,
    Sigmoid,
    Tanh,
    /// Softmax is vector-valued; `apply()` handles it over the whole output.
    /// The element-wise `function()` is never reached for this variant.
    Softmax,
    #[serde(rename = "linear")]
    Identity,
}

impl ActivationFunction {
    /// Element-wise activation. For `Softmax`, use `apply()`.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Identity => x,
            ActivationFunction::Softmax => {
                panic!("ActivationFunction::Softmax::function() must not be called directly; \
                        use ActivationFunction::apply() which applies the full-vector softmax.")
            }
        }
    }

    /// Element-wise derivative evaluated at the pre-activation `x`.
    ///
    /// For `Softmax` the network only allows it as the final operation paired
    /// with categorical cross-entropy, whose gradient w.r.t. the logits is
    /// already `predicted - expected`. Returning `1.0` passes that delta
    /// through without double-applying the Jacobian.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Softmax => 1.0,
        }
    }

    /// Applies the activation to a whole pre-activation vector.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(z),
            _ => z.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Multiplies an upstream gradient by the derivative at `z`, in place.
    pub fn backprop(&self, grad: &mut [f64], z: &[f64]) {
        if matches!(self, ActivationFunction::Identity | ActivationFunction::Softmax) {
            return;
        }
        for (g, &x) in grad.iter_mut().zip(z) {
            *g *= self.derivative(x);
        }
    }

    /// Name used in model summaries.
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::ReLU => "relu",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::Softmax => "softmax",
            ActivationFunction::Identity => "linear",
        }
    }
}

/// Numerically stable softmax: subtracts the max before exponentiating.
pub fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
