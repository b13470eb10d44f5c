use serde::{Serialize, Deserialize};

use crate::math::tensor::{Shape, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Max,
    Average,
}

impl PoolKind {
    pub fn layer_name(self) -> &'static str {
        match self {
            PoolKind::Max => "MaxPooling2D",
            PoolKind::Average => "AveragePooling2D",
        }
    }
}

/// Spatial pooling with valid padding, applied per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool2D {
    pub kind: PoolKind,
    pub pool_size: usize,
    pub stride: usize,
    pub input_shape: Shape,
    /// For max pooling: flat input index that won each output cell.
    #[serde(skip)]
    winners: Vec<usize>,
}

impl Pool2D {
    pub fn new(kind: PoolKind, input_shape: Shape, pool_size: usize, stride: usize) -> Pool2D {
        Pool2D { kind, pool_size, stride, input_shape, winners: Vec::new() }
    }

    pub fn output_shape(&self) -> Shape {
        let out = |n: usize| if n < self.pool_size { 0 } else { (n - self.pool_size) / self.stride + 1 };
        Shape::new(out(self.input_shape.height), out(self.input_shape.width), self.input_shape.channels)
    }

    pub fn forward(&mut self, input: Tensor, training: bool) -> Tensor {
        let out_shape = self.output_shape();
        let mut out = Tensor::zeros(out_shape);
        if training && self.kind == PoolKind::Max {
            self.winners = vec![0; out_shape.len()];
        }
        let window = (self.pool_size * self.pool_size) as f64;

        for oy in 0..out_shape.height {
            for ox in 0..out_shape.width {
                for c in 0..out_shape.channels {
                    let o = out.index(oy, ox, c);
                    match self.kind {
                        PoolKind::Max => {
                            let mut best = f64::NEG_INFINITY;
                            let mut best_idx = 0;
                            for py in 0..self.pool_size {
                                for px in 0..self.pool_size {
                                    let i = input.index(oy * self.stride + py, ox * self.stride + px, c);
                                    // Strict `>` keeps the first maximum on ties.
                                    if input.data[i] > best {
                                        best = input.data[i];
                                        best_idx = i;
                                    }
                                }
                            }
                            out.data[o] = best;
                            if training {
                                self.winners[o] = best_idx;
                            }
                        }
                        PoolKind::Average => {
                            let mut sum = 0.0;
                            for py in 0..self.pool_size {
                                for px in 0..self.pool_size {
                                    sum += input.at(oy * self.stride + py, ox * self.stride + px, c);
                                }
                            }
                            out.data[o] = sum / window;
                        }
                    }
                }
            }
        }
        out
    }

    pub fn backward(&mut self, grad: Tensor) -> Tensor {
        let mut grad_in = Tensor::zeros(self.input_shape);
        match self.kind {
            PoolKind::Max => {
                assert_eq!(self.winners.len(), grad.data.len(), "MaxPooling2D::backward called without a training forward pass");
                for (&i, g) in self.winners.iter().zip(&grad.data) {
                    grad_in.data[i] += g;
                }
            }
            PoolKind::Average => {
                let share = 1.0 / (self.pool_size * self.pool_size) as f64;
                let out_shape = grad.shape;
                for oy in 0..out_shape.height {
                    for ox in 0..out_shape.width {
                        for c in 0..out_shape.channels {
                            let g = grad.at(oy, ox, c) * share;
                            for py in 0..self.pool_size {
                                for px in 0..self.pool_size {
                                    let i = grad_in.index(oy * self.stride + py, ox * self.stride + px, c);
                                    grad_in.data[i] += g;
                                }
                            }
                        }
                    }
                }
            }
        }
        grad_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Tensor {
        // 4×4 single channel: 1..=16
        Tensor::from_vec(Shape::new(4, 4, 1), (1..=16).map(f64::from).collect())
    }

    #[test]
    fn max_pool_halves_and_picks_maximum() {
        let mut p = Pool2D::new(PoolKind::Max, Shape::new(4, 4, 1), 2, 2);
        assert_eq!(p.output_shape(), Shape::new(2, 2, 1));
        let out = p.forward(grid(), true);
        assert_eq!(out.data, vec![6.0, 8.0, 14.0, 16.0]);

        let g = p.backward(Tensor::from_vec(out.shape, vec![1.0, 2.0, 3.0, 4.0]));
        let mut expected = vec![0.0; 16];
        expected[5] = 1.0;
        expected[7] = 2.0;
        expected[13] = 3.0;
        expected[15] = 4.0;
        assert_eq!(g.data, expected);
    }

    #[test]
    fn max_pool_ties_route_to_first() {
        let mut p = Pool2D::new(PoolKind::Max, Shape::new(2, 2, 1), 2, 2);
        p.forward(Tensor::from_vec(Shape::new(2, 2, 1), vec![3.0; 4]), true);
        let g = p.backward(Tensor::from_vec(Shape::new(1, 1, 1), vec![1.0]));
        assert_eq!(g.data, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn odd_sizes_drop_the_remainder() {
        let p = Pool2D::new(PoolKind::Max, Shape::new(7, 7, 64), 2, 2);
        assert_eq!(p.output_shape(), Shape::new(3, 3, 64));
    }

    #[test]
    fn average_pool_spreads_gradient() {
        let mut p = Pool2D::new(PoolKind::Average, Shape::new(4, 4, 1), 2, 2);
        let out = p.forward(grid(), true);
        assert_eq!(out.data, vec![3.5, 5.5, 11.5, 13.5]);
        let g = p.backward(Tensor::from_vec(out.shape, vec![4.0; 4]));
        assert!(g.data.iter().all(|&x| (x - 1.0).abs() < 1e-12));
    }
}
