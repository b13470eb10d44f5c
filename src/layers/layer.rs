use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::layers::activation_layer::ActivationLayer;
use crate::layers::conv2d::Conv2D;
use crate::layers::dense::Dense;
use crate::layers::dropout::Dropout;
use crate::layers::flatten::Flatten;
use crate::layers::pooling::Pool2D;
use crate::error::{Error, Result};
use crate::math::tensor::{Shape, Tensor};

/// Whether a forward pass is part of training (dropout active, caches kept
/// for backprop) or plain inference.
pub enum Phase<'a> {
    Train(&'a mut StdRng),
    Infer,
}

impl Phase<'_> {
    pub fn is_training(&self) -> bool {
        matches!(self, Phase::Train(_))
    }

    /// Shorter-lived copy so the same phase can be handed to every layer.
    pub fn reborrow(&mut self) -> Phase<'_> {
        match self {
            Phase::Train(rng) => Phase::Train(&mut **rng),
            Phase::Infer => Phase::Infer,
        }
    }
}

/// One trainable buffer together with its accumulated gradient.
pub struct ParamMut<'a> {
    pub values: &'a mut [f64],
    pub grads: &'a mut [f64],
}

/// A layer of a sequential network.
///
/// The variant tag doubles as the layer type in saved model JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    Conv2D(Conv2D),
    Pooling2D(Pool2D),
    Flatten(Flatten),
    Dense(Dense),
    Dropout(Dropout),
    Activation(ActivationLayer),
}

impl Layer {
    pub fn forward(&mut self, input: Tensor, phase: Phase<'_>) -> Tensor {
        match self {
            Layer::Conv2D(l) => l.forward(input, phase.is_training()),
            Layer::Pooling2D(l) => l.forward(input, phase.is_training()),
            Layer::Flatten(l) => l.forward(input),
            Layer::Dense(l) => l.forward(input, phase.is_training()),
            Layer::Dropout(l) => l.forward(input, phase),
            Layer::Activation(l) => l.forward(input, phase.is_training()),
        }
    }

    /// Takes ∂L/∂output, accumulates parameter gradients, returns ∂L/∂input.
    /// Must follow a training-phase `forward` on the same sample.
    pub fn backward(&mut self, grad: Tensor) -> Tensor {
        match self {
            Layer::Conv2D(l) => l.backward(grad),
            Layer::Pooling2D(l) => l.backward(grad),
            Layer::Flatten(l) => l.backward(grad),
            Layer::Dense(l) => l.backward(grad),
            Layer::Dropout(l) => l.backward(grad),
            Layer::Activation(l) => l.backward(grad),
        }
    }

    pub fn input_shape(&self) -> Shape {
        match self {
            Layer::Conv2D(l) => l.input_shape,
            Layer::Pooling2D(l) => l.input_shape,
            Layer::Flatten(l) => l.input_shape,
            Layer::Dense(l) => Shape::flat(l.weights.rows),
            Layer::Dropout(l) => l.shape,
            Layer::Activation(l) => l.shape,
        }
    }

    pub fn output_shape(&self) -> Shape {
        match self {
            Layer::Conv2D(l) => l.output_shape(),
            Layer::Pooling2D(l) => l.output_shape(),
            Layer::Flatten(l) => Shape::flat(l.input_shape.len()),
            Layer::Dense(l) => Shape::flat(l.weights.cols),
            Layer::Dropout(l) => l.shape,
            Layer::Activation(l) => l.shape,
        }
    }

    pub fn param_count(&self) -> usize {
        match self {
            Layer::Conv2D(l) => l.kernel.len() + l.bias.len(),
            Layer::Dense(l) => l.weights.data.len() + l.biases.len(),
            _ => 0,
        }
    }

    pub fn params_mut(&mut self) -> Vec<ParamMut<'_>> {
        match self {
            Layer::Conv2D(l) => l.params_mut(),
            Layer::Dense(l) => l.params_mut(),
            _ => Vec::new(),
        }
    }

    /// Checks hyperparameters and parameter buffer lengths of a layer that
    /// was deserialized rather than built, before any shape is derived from it.
    pub fn check(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidSpec(format!("{} layer: {}", self.kind(), msg)));
        if self.input_shape().is_empty() {
            return invalid(format!("empty input shape {}", self.input_shape()));
        }
        match self {
            Layer::Conv2D(l) => {
                if l.filters == 0 || l.kernel_size == 0 || l.stride == 0 {
                    return invalid(format!(
                        "filters {}, kernel_size {} and stride {} must be at least 1",
                        l.filters, l.kernel_size, l.stride
                    ));
                }
                let expected = l.kernel_size * l.kernel_size * l.input_shape.channels * l.filters;
                if l.kernel.len() != expected {
                    return invalid(format!("kernel has {} values, expected {}", l.kernel.len(), expected));
                }
                if l.bias.len() != l.filters {
                    return invalid(format!("bias has {} values, expected {}", l.bias.len(), l.filters));
                }
            }
            Layer::Pooling2D(l) => {
                if l.pool_size == 0 || l.stride == 0 {
                    return invalid(format!("pool_size {} and stride {} must be at least 1", l.pool_size, l.stride));
                }
            }
            Layer::Dense(l) => {
                let w = &l.weights;
                if w.data.len() != w.rows * w.cols {
                    return invalid(format!("weights have {} values, expected {}x{}", w.data.len(), w.rows, w.cols));
                }
                if l.biases.len() != w.cols {
                    return invalid(format!("biases have {} values, expected {}", l.biases.len(), w.cols));
                }
            }
            Layer::Dropout(l) => {
                if !(0.0..1.0).contains(&l.rate) {
                    return invalid(format!("rate {} is outside [0, 1)", l.rate));
                }
            }
            Layer::Flatten(_) | Layer::Activation(_) => {}
        }
        if self.output_shape().is_empty() {
            return invalid(format!("input {} produces an empty output", self.input_shape()));
        }
        Ok(())
    }

    /// Layer type as shown in model summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Conv2D(_) => "Conv2D",
            Layer::Pooling2D(l) => l.kind.layer_name(),
            Layer::Flatten(_) => "Flatten",
            Layer::Dense(_) => "Dense",
            Layer::Dropout(_) => "Dropout",
            Layer::Activation(_) => "Activation",
        }
    }
}

/// Resizes a gradient buffer after deserialization, where it is skipped.
pub(crate) fn ensure_len(buf: &mut Vec<f64>, len: usize) {
    if buf.len() != len {
        *buf = vec![0.0; len];
    }
}
