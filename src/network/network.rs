use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::layers::layer::{Layer, ParamMut, Phase};
use crate::loss::loss_type::LossType;
use crate::math::tensor::{Shape, Tensor};
use crate::network::metadata::ModelMetadata;
use crate::network::spec::ModelSpec;
use crate::network::summary::Summary;
use crate::optim::Optimizer;

/// A sequential model: input shape, ordered layers and the loss it is
/// trained with. Serializes with its architecture so a saved file is enough
/// to reload it for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub input_shape: Shape,
    pub layers: Vec<Layer>,
    pub loss: LossType,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl Network {
    /// Validates `spec` and instantiates every layer with initialised weights.
    pub fn build<R: Rng + ?Sized>(spec: &ModelSpec, rng: &mut R) -> Result<Network> {
        spec.validate()?;
        let mut shape = spec.input_shape;
        let mut layers = Vec::with_capacity(spec.layers.len());
        for layer_spec in &spec.layers {
            let layer = layer_spec.build(shape, rng);
            shape = layer.output_shape();
            layers.push(layer);
        }
        Ok(Network { input_shape: spec.input_shape, layers, loss: spec.loss, metadata: None })
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.output_shape().len()).unwrap_or(0)
    }

    pub fn check_input(&self, shape: Shape) -> Result<()> {
        if shape != self.input_shape {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", self.input_shape),
                actual: format!("{:?}", shape),
            });
        }
        Ok(())
    }

    /// Forward pass. In `Phase::Train` every layer keeps what it needs for
    /// `backward`. The input shape must already have been checked.
    pub fn forward(&mut self, input: &Tensor, mut phase: Phase<'_>) -> Vec<f64> {
        debug_assert_eq!(input.shape, self.input_shape);
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(current, phase.reborrow());
        }
        current.data
    }

    /// Inference on a single image, returning the output vector
    /// (class probabilities for a softmax model).
    pub fn predict(&mut self, input: &Tensor) -> Result<Vec<f64>> {
        self.check_input(input.shape)?;
        Ok(self.forward(input, Phase::Infer))
    }

    /// Back-propagates ∂L/∂output through every layer, accumulating
    /// parameter gradients. Must follow a training-phase `forward`.
    pub fn backward(&mut self, output_grad: Vec<f64>) {
        let mut grad = Tensor::flat(output_grad);
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(grad);
        }
    }

    pub fn params_mut(&mut self) -> Vec<ParamMut<'_>> {
        self.layers.iter_mut().flat_map(|l| l.params_mut()).collect()
    }

    /// Scales accumulated gradients by `scale` (1 / batch size), hands them
    /// to the optimizer, then clears them for the next batch.
    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer, scale: f64) {
        optimizer.begin_step();
        for (slot, param) in self.params_mut().into_iter().enumerate() {
            for g in param.grads.iter_mut() {
                *g *= scale;
            }
            optimizer.update(slot, param.values, param.grads);
            param.grads.fill(0.0);
        }
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(Layer::param_count).sum()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(self)
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by
    /// `save_json`, checking that consecutive layers fit together.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)?;
        network.check_layers()?;
        Ok(network)
    }

    fn check_layers(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidSpec("saved model has no layers".into()));
        }
        let mut shape = self.input_shape;
        for (i, layer) in self.layers.iter().enumerate() {
            layer.check().map_err(|e| match e {
                Error::InvalidSpec(msg) => Error::InvalidSpec(format!("layer {}: {}", i, msg)),
                other => other,
            })?;
            if layer.input_shape() != shape {
                return Err(Error::InvalidSpec(format!(
                    "layer {} ({}) expects {} but receives {}",
                    i, layer.kind(), layer.input_shape(), shape
                )));
            }
            shape = layer.output_shape();
        }
        Ok(())
    }
}
