use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::{ActivationLayer, Conv2D, Dense, Dropout, Flatten, Layer, Padding, Pool2D, PoolKind};
use crate::loss::loss_type::LossType;
use crate::math::tensor::Shape;

fn default_stride() -> usize { 1 }
fn default_activation() -> ActivationFunction { ActivationFunction::Identity }

/// Describes one layer in a sequential model.
///
/// Serialized with a `"type"` tag, e.g.
/// `{"type": "Conv2D", "filters": 32, "kernel_size": 3, "activation": "relu", "padding": "same"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerSpec {
    Conv2D {
        filters: usize,
        kernel_size: usize,
        #[serde(default = "default_stride")]
        strides: usize,
        #[serde(default)]
        padding: Padding,
        #[serde(default = "default_activation")]
        activation: ActivationFunction,
    },
    /// `strides` defaults to `pool_size`.
    MaxPooling2D {
        pool_size: usize,
        #[serde(default)]
        strides: Option<usize>,
    },
    AveragePooling2D {
        pool_size: usize,
        #[serde(default)]
        strides: Option<usize>,
    },
    Flatten,
    Dense {
        units: usize,
        #[serde(default = "default_activation")]
        activation: ActivationFunction,
    },
    Dropout {
        rate: f64,
    },
    Activation {
        activation: ActivationFunction,
    },
}

impl LayerSpec {
    /// Output shape for a given input shape, or why the layer cannot accept it.
    pub fn output_shape(&self, input: Shape) -> Result<Shape> {
        let shape = match *self {
            LayerSpec::Conv2D { filters, kernel_size, strides, padding, .. } => {
                if input.is_flat() {
                    return Err(Error::InvalidSpec(format!(
                        "Conv2D needs a spatial input, got {}", input
                    )));
                }
                let (h, _) = padding.resolve(input.height, kernel_size, strides);
                let (w, _) = padding.resolve(input.width, kernel_size, strides);
                Shape::new(h, w, filters)
            }
            LayerSpec::MaxPooling2D { pool_size, strides } | LayerSpec::AveragePooling2D { pool_size, strides } => {
                let s = strides.unwrap_or(pool_size);
                let out = |n: usize| if n < pool_size { 0 } else { (n - pool_size) / s + 1 };
                Shape::new(out(input.height), out(input.width), input.channels)
            }
            LayerSpec::Flatten => Shape::flat(input.len()),
            LayerSpec::Dense { units, .. } => {
                if !input.is_flat() {
                    return Err(Error::InvalidSpec(format!(
                        "Dense expects a flat input, got {}; add a Flatten layer first", input
                    )));
                }
                Shape::flat(units)
            }
            LayerSpec::Dropout { .. } | LayerSpec::Activation { .. } => input,
        };
        if shape.is_empty() {
            return Err(Error::InvalidSpec(format!(
                "{} turns input {} into an empty output", self.kind(), input
            )));
        }
        Ok(shape)
    }

    fn check_params(&self) -> Result<()> {
        let bad = |msg: String| Err(Error::InvalidSpec(msg));
        match *self {
            LayerSpec::Conv2D { filters, kernel_size, strides, .. } => {
                if filters == 0 || kernel_size == 0 || strides == 0 {
                    return bad(format!(
                        "Conv2D filters, kernel_size and strides must be positive \
                         (got {}, {}, {})", filters, kernel_size, strides
                    ));
                }
            }
            LayerSpec::MaxPooling2D { pool_size, strides } | LayerSpec::AveragePooling2D { pool_size, strides } => {
                if pool_size == 0 || strides == Some(0) {
                    return bad(format!("{} pool_size and strides must be positive", self.kind()));
                }
            }
            LayerSpec::Dense { units, .. } if units == 0 => {
                return bad("Dense units must be positive".into());
            }
            LayerSpec::Dropout { rate } if !(0.0..1.0).contains(&rate) => {
                return bad(format!("Dropout rate must be in [0, 1), got {}", rate));
            }
            _ => {}
        }
        Ok(())
    }

    fn activation(&self) -> Option<ActivationFunction> {
        match *self {
            LayerSpec::Conv2D { activation, .. }
            | LayerSpec::Dense { activation, .. }
            | LayerSpec::Activation { activation } => Some(activation),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Conv2D { .. } => "Conv2D",
            LayerSpec::MaxPooling2D { .. } => "MaxPooling2D",
            LayerSpec::AveragePooling2D { .. } => "AveragePooling2D",
            LayerSpec::Flatten => "Flatten",
            LayerSpec::Dense { .. } => "Dense",
            LayerSpec::Dropout { .. } => "Dropout",
            LayerSpec::Activation { .. } => "Activation",
        }
    }

    /// Instantiates the layer with freshly initialised parameters.
    pub fn build<R: Rng + ?Sized>(&self, input: Shape, rng: &mut R) -> Layer {
        match *self {
            LayerSpec::Conv2D { filters, kernel_size, strides, padding, activation } => {
                Layer::Conv2D(Conv2D::new(input, filters, kernel_size, strides, padding, activation, rng))
            }
            LayerSpec::MaxPooling2D { pool_size, strides } => {
                Layer::Pooling2D(Pool2D::new(PoolKind::Max, input, pool_size, strides.unwrap_or(pool_size)))
            }
            LayerSpec::AveragePooling2D { pool_size, strides } => {
                Layer::Pooling2D(Pool2D::new(PoolKind::Average, input, pool_size, strides.unwrap_or(pool_size)))
            }
            LayerSpec::Flatten => Layer::Flatten(Flatten::new(input)),
            LayerSpec::Dense { units, activation } => Layer::Dense(Dense::new(units, input.len(), activation, rng)),
            LayerSpec::Dropout { rate } => Layer::Dropout(Dropout::new(rate, input)),
            LayerSpec::Activation { activation } => Layer::Activation(ActivationLayer::new(activation, input)),
        }
    }
}

/// A fully serializable description of a sequential model plus its loss.
///
/// `ModelSpec` can be saved to / loaded from JSON independently of the
/// trained weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub input_shape: Shape,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub loss: LossType,
}

impl Default for ModelSpec {
    fn default() -> Self {
        ModelSpec::mnist_cnn()
    }
}

impl ModelSpec {
    /// Two conv/pool blocks, a 128-unit hidden layer with dropout and a
    /// 10-way softmax, for 28×28 grayscale digits.
    pub fn mnist_cnn() -> ModelSpec {
        ModelSpec::small_cnn(Shape::new(28, 28, 1), 10)
    }

    /// The same architecture for any input shape and class count.
    pub fn small_cnn(input_shape: Shape, num_classes: usize) -> ModelSpec {
        use ActivationFunction::{ReLU, Softmax};
        ModelSpec {
            input_shape,
            layers: vec![
                LayerSpec::Conv2D { filters: 32, kernel_size: 3, strides: 1, padding: Padding::Same, activation: ReLU },
                LayerSpec::MaxPooling2D { pool_size: 2, strides: Some(2) },
                LayerSpec::Conv2D { filters: 64, kernel_size: 3, strides: 1, padding: Padding::Same, activation: ReLU },
                LayerSpec::MaxPooling2D { pool_size: 2, strides: Some(2) },
                LayerSpec::Flatten,
                LayerSpec::Dense { units: 128, activation: ReLU },
                LayerSpec::Dropout { rate: 0.5 },
                LayerSpec::Dense { units: num_classes, activation: Softmax },
            ],
            loss: LossType::CategoricalCrossentropy,
        }
    }

    /// Checks the architecture and returns the output shape of every layer.
    pub fn validate(&self) -> Result<Vec<Shape>> {
        if self.input_shape.is_empty() {
            return Err(Error::InvalidSpec(format!("input shape {:?} is empty", self.input_shape)));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidSpec("model has no layers".into()));
        }

        let last = self.layers.len() - 1;
        let mut shape = self.input_shape;
        let mut shapes = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            layer.check_params().map_err(|e| prefix(i, e))?;
            if layer.activation() == Some(ActivationFunction::Softmax) && i != last {
                return Err(Error::InvalidSpec(format!(
                    "layer {} ({}): softmax is only supported as the final activation", i, layer.kind()
                )));
            }
            shape = layer.output_shape(shape).map_err(|e| prefix(i, e))?;
            shapes.push(shape);
        }

        let output_softmax = self.layers[last].activation() == Some(ActivationFunction::Softmax);
        match self.loss {
            LossType::CategoricalCrossentropy if !output_softmax => {
                return Err(Error::InvalidSpec(
                    "categorical_crossentropy requires a softmax output layer".into(),
                ));
            }
            LossType::Mse if output_softmax => {
                return Err(Error::InvalidSpec("a softmax output must be trained with categorical_crossentropy".into()));
            }
            _ => {}
        }
        if !shape.is_flat() {
            return Err(Error::InvalidSpec(format!("model output must be flat, got {}", shape)));
        }
        Ok(shapes)
    }

    /// Number of output units (classes).
    pub fn output_size(&self) -> Result<usize> {
        let shapes = self.validate()?;
        Ok(shapes.last().map(|s| s.len()).unwrap_or(0))
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `ModelSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<std::path::Path>) -> Result<ModelSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn prefix(index: usize, err: Error) -> Error {
    match err {
        Error::InvalidSpec(msg) if !msg.starts_with("layer ") => Error::InvalidSpec(format!("layer {}: {}", index, msg)),
        other => other,
    }
}
