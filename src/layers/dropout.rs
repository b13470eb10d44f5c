use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::layers::layer::Phase;
use crate::math::tensor::{Shape, Tensor};

/// Inverted dropout: survivors are scaled by `1 / (1 - rate)` during
/// training so inference is a plain pass-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    pub rate: f64,
    pub shape: Shape,
    #[serde(skip)]
    mask: Vec<f64>,
}

impl Dropout {
    pub fn new(rate: f64, shape: Shape) -> Dropout {
        Dropout { rate, shape, mask: Vec::new() }
    }

    pub fn forward(&mut self, mut input: Tensor, phase: Phase<'_>) -> Tensor {
        let Phase::Train(rng) = phase else {
            return input;
        };
        let scale = 1.0 / (1.0 - self.rate);
        self.mask = (0..input.data.len())
            .map(|_| if rng.gen::<f64>() < self.rate { 0.0 } else { scale })
            .collect();
        for (x, m) in input.data.iter_mut().zip(&self.mask) {
            *x *= m;
        }
        input
    }

    pub fn backward(&mut self, mut grad: Tensor) -> Tensor {
        assert_eq!(self.mask.len(), grad.data.len(), "Dropout::backward called without a training forward pass");
        for (g, m) in grad.data.iter_mut().zip(&self.mask) {
            *g *= m;
        }
        grad
    }
}
