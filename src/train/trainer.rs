use rand::rngs::StdRng;

use crate::data::dataset::Dataset;
use crate::layers::layer::Phase;
use crate::network::network::Network;
use crate::optim::Optimizer;
use crate::train::evaluate::argmax;

/// Loss and hit count summed over the samples of one mini-batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchOutcome {
    pub loss_sum: f64,
    pub correct: usize,
    pub samples: usize,
}

/// Runs one mini-batch: a training-phase forward and a backward pass per
/// sample, accumulating gradients, then a single optimizer step with the
/// gradients averaged over the batch.
pub fn train_batch(
    network: &mut Network,
    data: &Dataset,
    indices: &[usize],
    optimizer: &mut dyn Optimizer,
    rng: &mut StdRng,
) -> BatchOutcome {
    assert!(!indices.is_empty(), "a batch needs at least one sample");
    let loss = network.loss;
    let mut outcome = BatchOutcome::default();

    for &idx in indices {
        let label = data.labels[idx];
        let target = data.one_hot(label);

        let output = network.forward(&data.images[idx], Phase::Train(&mut *rng));
        outcome.loss_sum += loss.loss(&output, &target);
        if argmax(&output) == label {
            outcome.correct += 1;
        }

        // ∂L/∂output; for softmax + CE this is already (p - y).
        network.backward(loss.derivative(&output, &target));
    }
    outcome.samples = indices.len();

    network.apply_gradients(optimizer, 1.0 / indices.len() as f64);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use crate::activation::activation::ActivationFunction;
    use crate::loss::loss_type::LossType;
    use crate::math::tensor::{Shape, Tensor};
    use crate::network::spec::{LayerSpec, ModelSpec};
    use crate::optim::Sgd;

    fn toy() -> (Network, Dataset) {
        let spec = ModelSpec {
            input_shape: Shape::flat(2),
            layers: vec![LayerSpec::Dense { units: 2, activation: ActivationFunction::Softmax }],
            loss: LossType::CategoricalCrossentropy,
        };
        let net = Network::build(&spec, &mut StdRng::seed_from_u64(0)).unwrap();
        let shape = Shape::flat(2);
        let data = Dataset::new(
            shape,
            vec![Tensor::flat(vec![1.0, 0.0]), Tensor::flat(vec![0.0, 1.0])],
            vec![0, 1],
            2,
        ).unwrap();
        (net, data)
    }

    #[test]
    fn step_reduces_batch_loss() {
        let (mut net, data) = toy();
        let mut opt = Sgd::new(0.5);
        let mut rng = StdRng::seed_from_u64(1);
        let first = train_batch(&mut net, &data, &[0, 1], &mut opt, &mut rng);
        assert_eq!(first.samples, 2);
        let mut last = first;
        for _ in 0..20 {
            last = train_batch(&mut net, &data, &[0, 1], &mut opt, &mut rng);
        }
        assert!(last.loss_sum < first.loss_sum);
        assert_eq!(last.correct, 2);
    }

    #[test]
    fn gradients_are_cleared_after_the_step() {
        let (mut net, data) = toy();
        let mut opt = Sgd::new(0.1);
        train_batch(&mut net, &data, &[0], &mut opt, &mut StdRng::seed_from_u64(2));
        assert!(net.params_mut().iter().all(|p| p.grads.iter().all(|&g| g == 0.0)));
    }
}
