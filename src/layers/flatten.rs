use serde::{Serialize, Deserialize};

use crate::math::tensor::{Shape, Tensor};

/// Reshapes `(h, w, c)` into a `(1, 1, h·w·c)` vector. The HWC buffer is
/// already in row-major order so no data moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flatten {
    pub input_shape: Shape,
}

impl Flatten {
    pub fn new(input_shape: Shape) -> Flatten {
        Flatten { input_shape }
    }

    pub fn forward(&self, input: Tensor) -> Tensor {
        input.reshape(Shape::flat(self.input_shape.len()))
    }

    pub fn backward(&self, grad: Tensor) -> Tensor {
        grad.reshape(self.input_shape)
    }
}
