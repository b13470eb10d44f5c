use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::layer::{ensure_len, ParamMut};
use crate::math::init::glorot_uniform;
use crate::math::matrix::Matrix;
use crate::math::tensor::Tensor;

/// Fully connected layer: `a = σ(x · W + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Matrix,
    pub biases: Vec<f64>,
    pub activator: ActivationFunction,
    #[serde(skip)]
    weights_grad: Matrix,
    #[serde(skip)]
    biases_grad: Vec<f64>,
    #[serde(skip)]
    inputs: Vec<f64>,
    // pre-activation values (z = xW + b) needed for correct derivative
    #[serde(skip)]
    pre_neurons: Vec<f64>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(units: usize, input_size: usize, activation: ActivationFunction, rng: &mut R) -> Dense {
        let weights = Matrix::from_vec(input_size, units, glorot_uniform(input_size, units, input_size * units, rng));
        Dense {
            weights,
            biases: vec![0.0; units],
            activator: activation,
            weights_grad: Matrix::zeros(input_size, units),
            biases_grad: vec![0.0; units],
            inputs: Vec::new(),
            pre_neurons: Vec::new(),
        }
    }

    pub fn forward(&mut self, input: Tensor, training: bool) -> Tensor {
        let mut z = self.weights.vec_mul(&input.data);
        for (zi, b) in z.iter_mut().zip(&self.biases) {
            *zi += b;
        }
        let a = self.activator.apply(&z);
        if training {
            self.inputs = input.data;
            self.pre_neurons = z;
        }
        Tensor::flat(a)
    }

    /// `grad` is ∂L/∂a for this layer (error in activation space).
    pub fn backward(&mut self, grad: Tensor) -> Tensor {
        assert_eq!(self.inputs.len(), self.weights.rows, "Dense::backward called without a training forward pass");
        self.ensure_grads();

        // δ = error ⊙ σ'(z)
        let mut delta = grad.data;
        self.activator.backprop(&mut delta, &self.pre_neurons);

        self.weights_grad.add_outer(&self.inputs, &delta);
        for (b, d) in self.biases_grad.iter_mut().zip(&delta) {
            *b += d;
        }
        self.inputs.clear();

        // Propagate δ through the weights to get ∂L/∂a of the previous layer.
        Tensor::flat(self.weights.mul_vec(&delta))
    }

    fn ensure_grads(&mut self) {
        if self.weights_grad.rows != self.weights.rows || self.weights_grad.cols != self.weights.cols {
            self.weights_grad = Matrix::zeros(self.weights.rows, self.weights.cols);
        }
        ensure_len(&mut self.biases_grad, self.biases.len());
    }

    pub(crate) fn params_mut(&mut self) -> Vec<ParamMut<'_>> {
        self.ensure_grads();
        vec![
            ParamMut { values: &mut self.weights.data, grads: &mut self.weights_grad.data },
            ParamMut { values: &mut self.biases, grads: &mut self.biases_grad },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn forward_is_affine_then_activation() {
        let mut d = Dense::new(2, 3, ActivationFunction::ReLU, &mut StdRng::seed_from_u64(0));
        d.weights = Matrix::from_vec(3, 2, vec![1.0, -1.0, 0.0, 2.0, 1.0, 0.0]);
        d.biases = vec![0.5, -0.5];
        let out = d.forward(Tensor::flat(vec![1.0, 1.0, 1.0]), false);
        assert_eq!(out.data, vec![2.5, 0.5]);
    }

    #[test]
    fn backward_accumulates_outer_product() {
        let mut d = Dense::new(2, 2, ActivationFunction::Identity, &mut StdRng::seed_from_u64(0));
        d.weights = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        d.forward(Tensor::flat(vec![1.0, 2.0]), true);
        let back = d.backward(Tensor::flat(vec![1.0, -1.0]));
        assert_eq!(d.weights_grad.data, vec![1.0, -1.0, 2.0, -2.0]);
        assert_eq!(d.biases_grad, vec![1.0, -1.0]);
        assert_eq!(back.data, vec![-1.0, -1.0]);
    }

    #[test]
    fn weights_survive_json_round_trip() {
        let d = Dense::new(4, 3, ActivationFunction::Softmax, &mut StdRng::seed_from_u64(9));
        let json = serde_json::to_string(&d).unwrap();
        let mut back: Dense = serde_json::from_str(&json).unwrap();
        assert_eq!(back.weights, d.weights);
        assert_eq!(back.activator, ActivationFunction::Softmax);
        // Gradient buffers are rebuilt on demand after loading.
        assert_eq!(back.params_mut()[0].grads.len(), 12);
    }
}
