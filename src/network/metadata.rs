use serde::{Deserialize, Serialize};

use crate::data::kind::DatasetKind;
use crate::data::preprocess::Scaling;
use crate::math::tensor::Shape;

/// Describes how to interpret the input fed to a Network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputType {
    /// Flat f64 features.
    Numeric,
    /// Grayscale image of width×height, normalized.
    ImageGrayscale { width: u32, height: u32 },
    /// RGB image of width×height, normalized, channels-last.
    ImageRgb { width: u32, height: u32 },
}

impl InputType {
    pub fn for_shape(shape: Shape) -> InputType {
        match shape.channels {
            _ if shape.is_flat() => InputType::Numeric,
            1 => InputType::ImageGrayscale { width: shape.width as u32, height: shape.height as u32 },
            3 => InputType::ImageRgb { width: shape.width as u32, height: shape.height as u32 },
            _ => InputType::Numeric,
        }
    }
}

/// Optional annotations attached to a saved Network.
/// All fields are Option<> so models saved without metadata deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    pub input_type: Option<InputType>,
    /// Human-readable class labels for the output layer (e.g. ["0","1",...,"9"]).
    pub output_labels: Option<Vec<String>>,
    /// Dataset the model was trained on.
    #[serde(default)]
    pub dataset: Option<DatasetKind>,
    /// Pixel scaling applied to raw inputs during training; inference must
    /// apply the same map.
    #[serde(default)]
    pub scaling: Option<Scaling>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_type_from_shape() {
        assert_eq!(
            InputType::for_shape(Shape::new(28, 28, 1)),
            InputType::ImageGrayscale { width: 28, height: 28 }
        );
        assert_eq!(InputType::for_shape(Shape::new(32, 32, 3)), InputType::ImageRgb { width: 32, height: 32 });
        assert_eq!(InputType::for_shape(Shape::flat(4)), InputType::Numeric);
    }
}
