use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::math::tensor::{Shape, Tensor};

/// Standalone activation, for architectures that keep the nonlinearity
/// separate from the preceding linear layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationLayer {
    pub activation: ActivationFunction,
    pub shape: Shape,
    #[serde(skip)]
    pre_activation: Vec<f64>,
}

impl ActivationLayer {
    pub fn new(activation: ActivationFunction, shape: Shape) -> ActivationLayer {
        ActivationLayer { activation, shape, pre_activation: Vec::new() }
    }

    pub fn forward(&mut self, input: Tensor, training: bool) -> Tensor {
        let out = Tensor::from_vec(input.shape, self.activation.apply(&input.data));
        if training {
            self.pre_activation = input.data;
        }
        out
    }

    pub fn backward(&mut self, mut grad: Tensor) -> Tensor {
        self.activation.backprop(&mut grad.data, &self.pre_activation);
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tanh_layer_round_trip() {
        let mut l = ActivationLayer::new(ActivationFunction::Tanh, Shape::flat(2));
        let out = l.forward(Tensor::flat(vec![0.0, 1.0]), true);
        assert!((out.data[1] - 1.0f64.tanh()).abs() < 1e-12);
        let g = l.backward(Tensor::flat(vec![1.0, 1.0]));
        assert!((g.data[0] - 1.0).abs() < 1e-12);
        assert!((g.data[1] - (1.0 - 1.0f64.tanh().powi(2))).abs() < 1e-12);
    }
}
