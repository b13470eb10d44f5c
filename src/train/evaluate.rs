use serde::{Serialize, Deserialize};

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::layers::layer::Phase;
use crate::math::tensor::Tensor;
use crate::network::network::Network;

/// Mean loss and accuracy of a network over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}

/// Inference-phase loss and accuracy over every sample of `data`.
pub fn evaluate(network: &mut Network, data: &Dataset) -> Result<Evaluation> {
    check_compatible(network, data)?;
    if data.is_empty() {
        return Err(Error::Dataset("cannot evaluate on an empty dataset".into()));
    }
    let loss_type = network.loss;
    let mut loss = 0.0;
    let mut correct = 0usize;
    for (image, &label) in data.images.iter().zip(&data.labels) {
        let output = network.forward(image, Phase::Infer);
        loss += loss_type.loss(&output, &data.one_hot(label));
        if argmax(&output) == label {
            correct += 1;
        }
    }
    let n = data.len() as f64;
    Ok(Evaluation { loss: loss / n, accuracy: correct as f64 / n })
}

/// Output vector (class probabilities for a softmax model) of every image.
pub fn predict(network: &mut Network, images: &[Tensor]) -> Result<Vec<Vec<f64>>> {
    images.iter().map(|img| network.predict(img)).collect()
}

/// Index of the maximum element in a slice; the first one wins on ties.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &x)| if x > best.1 { (i, x) } else { best })
        .0
}

/// `matrix[actual][predicted]` counts over `data`.
pub fn confusion_matrix(network: &mut Network, data: &Dataset) -> Result<Vec<Vec<usize>>> {
    check_compatible(network, data)?;
    let mut matrix = vec![vec![0usize; data.num_classes]; data.num_classes];
    for (image, &label) in data.images.iter().zip(&data.labels) {
        let predicted = argmax(&network.forward(image, Phase::Infer));
        matrix[label][predicted] += 1;
    }
    Ok(matrix)
}

pub(crate) fn check_compatible(network: &Network, data: &Dataset) -> Result<()> {
    network.check_input(data.shape)?;
    if network.output_size() != data.num_classes {
        return Err(Error::ShapeMismatch {
            expected: format!("{} output units", data.num_classes),
            actual: format!("{} output units", network.output_size()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::layer::Layer;
    use crate::loss::loss_type::LossType;
    use crate::math::tensor::Shape;
    use crate::network::spec::{LayerSpec, ModelSpec};
    use crate::activation::activation::ActivationFunction;
    use rand::{rngs::StdRng, SeedableRng};

    /// Identity-weighted softmax classifier: class = larger input.
    fn picker() -> Network {
        let spec = ModelSpec {
            input_shape: Shape::flat(2),
            layers: vec![LayerSpec::Dense { units: 2, activation: ActivationFunction::Softmax }],
            loss: LossType::CategoricalCrossentropy,
        };
        let mut net = Network::build(&spec, &mut StdRng::seed_from_u64(0)).unwrap();
        if let Layer::Dense(dense) = &mut net.layers[0] {
            dense.weights.data = vec![1.0, 0.0, 0.0, 1.0];
            dense.biases = vec![0.0, 0.0];
        }
        net
    }

    fn data() -> Dataset {
        Dataset::new(
            Shape::flat(2),
            vec![
                Tensor::flat(vec![3.0, 0.0]),
                Tensor::flat(vec![0.0, 3.0]),
                Tensor::flat(vec![2.0, 0.0]),
            ],
            vec![0, 1, 1],
            2,
        ).unwrap()
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn evaluate_counts_hits() {
        let mut net = picker();
        let eval = evaluate(&mut net, &data()).unwrap();
        assert!((eval.accuracy - 2.0 / 3.0).abs() < 1e-12);
        assert!(eval.loss > 0.0);
    }

    #[test]
    fn confusion_rows_are_actual_classes() {
        let mut net = picker();
        let m = confusion_matrix(&mut net, &data()).unwrap();
        assert_eq!(m, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn predictions_are_distributions() {
        let mut net = picker();
        let probs = predict(&mut net, &data().images).unwrap();
        assert_eq!(probs.len(), 3);
        for p in probs {
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_wrong_class_count() {
        let mut net = picker();
        let three = Dataset::new(Shape::flat(2), vec![Tensor::flat(vec![1.0, 0.0])], vec![2], 3).unwrap();
        assert!(evaluate(&mut net, &three).is_err());
    }
}
