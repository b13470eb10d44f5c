use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::layer::{ensure_len, ParamMut};
use crate::math::init::glorot_uniform;
use crate::math::tensor::{Shape, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Zero-pad so that `out = ceil(in / stride)`.
    Same,
    /// No padding: `out = (in - k) / stride + 1`.
    #[default]
    Valid,
}

impl Padding {
    /// Output length and leading pad along one spatial axis.
    pub fn resolve(self, input: usize, kernel: usize, stride: usize) -> (usize, usize) {
        match self {
            Padding::Valid => {
                if input < kernel {
                    (0, 0)
                } else {
                    ((input - kernel) / stride + 1, 0)
                }
            }
            Padding::Same => {
                let out = input.div_ceil(stride);
                let total = ((out - 1) * stride + kernel).saturating_sub(input);
                (out, total / 2)
            }
        }
    }
}

/// 2-D convolution over a channels-last input.
///
/// The kernel is stored as `(ky, kx, in_channel, filter)` so the innermost
/// loop walks a contiguous run of filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2D {
    pub filters: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: Padding,
    pub activation: ActivationFunction,
    pub input_shape: Shape,
    pub kernel: Vec<f64>,
    pub bias: Vec<f64>,
    #[serde(skip)]
    kernel_grad: Vec<f64>,
    #[serde(skip)]
    bias_grad: Vec<f64>,
    #[serde(skip)]
    input: Option<Tensor>,
    #[serde(skip)]
    pre_activation: Option<Tensor>,
}

impl Conv2D {
    pub fn new<R: Rng + ?Sized>(
        input_shape: Shape,
        filters: usize,
        kernel_size: usize,
        stride: usize,
        padding: Padding,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Conv2D {
        let k2 = kernel_size * kernel_size;
        let n = k2 * input_shape.channels * filters;
        let kernel = glorot_uniform(k2 * input_shape.channels, k2 * filters, n, rng);
        Conv2D {
            filters,
            kernel_size,
            stride,
            padding,
            activation,
            input_shape,
            kernel,
            bias: vec![0.0; filters],
            kernel_grad: vec![0.0; n],
            bias_grad: vec![0.0; filters],
            input: None,
            pre_activation: None,
        }
    }

    pub fn output_shape(&self) -> Shape {
        let (h, _) = self.padding.resolve(self.input_shape.height, self.kernel_size, self.stride);
        let (w, _) = self.padding.resolve(self.input_shape.width, self.kernel_size, self.stride);
        Shape::new(h, w, self.filters)
    }

    #[inline]
    fn kernel_offset(&self, ky: usize, kx: usize, ic: usize) -> usize {
        ((ky * self.kernel_size + kx) * self.input_shape.channels + ic) * self.filters
    }

    /// Maps an output coordinate plus kernel tap to an input coordinate,
    /// or `None` when the tap lands in the zero padding.
    #[inline]
    fn source(&self, o: usize, k: usize, pad: usize, limit: usize) -> Option<usize> {
        let i = (o * self.stride + k).checked_sub(pad)?;
        (i < limit).then_some(i)
    }

    pub fn forward(&mut self, input: Tensor, training: bool) -> Tensor {
        let out_shape = self.output_shape();
        let (_, pad_y) = self.padding.resolve(self.input_shape.height, self.kernel_size, self.stride);
        let (_, pad_x) = self.padding.resolve(self.input_shape.width, self.kernel_size, self.stride);
        let in_c = self.input_shape.channels;

        let mut z = Tensor::zeros(out_shape);
        for oy in 0..out_shape.height {
            for ox in 0..out_shape.width {
                let base = z.index(oy, ox, 0);
                let acc = &mut z.data[base..base + self.filters];
                acc.copy_from_slice(&self.bias);
                for ky in 0..self.kernel_size {
                    let Some(iy) = self.source(oy, ky, pad_y, self.input_shape.height) else { continue };
                    for kx in 0..self.kernel_size {
                        let Some(ix) = self.source(ox, kx, pad_x, self.input_shape.width) else { continue };
                        for ic in 0..in_c {
                            let x = input.at(iy, ix, ic);
                            if x == 0.0 {
                                continue;
                            }
                            let k = self.kernel_offset(ky, kx, ic);
                            for (a, w) in acc.iter_mut().zip(&self.kernel[k..k + self.filters]) {
                                *a += x * w;
                            }
                        }
                    }
                }
            }
        }

        let out = Tensor::from_vec(out_shape, self.activation.apply(&z.data));
        if training {
            self.input = Some(input);
            self.pre_activation = Some(z);
        }
        out
    }

    pub fn backward(&mut self, grad: Tensor) -> Tensor {
        let input = self.input.take().expect("Conv2D::backward called without a training forward pass");
        let z = self.pre_activation.take().expect("Conv2D::backward called without a training forward pass");
        ensure_len(&mut self.kernel_grad, self.kernel.len());
        ensure_len(&mut self.bias_grad, self.bias.len());

        let mut delta = grad.data;
        self.activation.backprop(&mut delta, &z.data);

        let out_shape = z.shape;
        let (_, pad_y) = self.padding.resolve(self.input_shape.height, self.kernel_size, self.stride);
        let (_, pad_x) = self.padding.resolve(self.input_shape.width, self.kernel_size, self.stride);
        let in_c = self.input_shape.channels;
        let mut grad_in = Tensor::zeros(self.input_shape);

        for oy in 0..out_shape.height {
            for ox in 0..out_shape.width {
                let base = z.index(oy, ox, 0);
                let d = &delta[base..base + self.filters];
                for (b, di) in self.bias_grad.iter_mut().zip(d) {
                    *b += di;
                }
                for ky in 0..self.kernel_size {
                    let Some(iy) = self.source(oy, ky, pad_y, self.input_shape.height) else { continue };
                    for kx in 0..self.kernel_size {
                        let Some(ix) = self.source(ox, kx, pad_x, self.input_shape.width) else { continue };
                        for ic in 0..in_c {
                            let k = self.kernel_offset(ky, kx, ic);
                            let x = input.at(iy, ix, ic);
                            let mut back = 0.0;
                            for f in 0..self.filters {
                                self.kernel_grad[k + f] += x * d[f];
                                back += self.kernel[k + f] * d[f];
                            }
                            let gi = grad_in.index(iy, ix, ic);
                            grad_in.data[gi] += back;
                        }
                    }
                }
            }
        }

        grad_in
    }

    pub(crate) fn params_mut(&mut self) -> Vec<ParamMut<'_>> {
        ensure_len(&mut self.kernel_grad, self.kernel.len());
        ensure_len(&mut self.bias_grad, self.bias.len());
        vec![
            ParamMut { values: &mut self.kernel, grads: &mut self.kernel_grad },
            ParamMut { values: &mut self.bias, grads: &mut self.bias_grad },
        ]
    }
}
