use serde::{Serialize, Deserialize};
use std::fmt;

/// Channels-last shape of an image or feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Shape {
    pub const fn new(height: usize, width: usize, channels: usize) -> Shape {
        Shape { height, width, channels }
    }

    /// Shape of a flat vector of `n` features.
    pub const fn flat(n: usize) -> Shape {
        Shape { height: 1, width: 1, channels: n }
    }

    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_flat(&self) -> bool {
        self.height == 1 && self.width == 1
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_flat() {
            write!(f, "(None, {})", self.channels)
        } else {
            write!(f, "(None, {}, {}, {})", self.height, self.width, self.channels)
        }
    }
}

/// Dense `(height, width, channels)` array of `f64` in row-major HWC order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Shape,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: Shape) -> Tensor {
        Tensor { shape, data: vec![0.0; shape.len()] }
    }

    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Tensor {
        assert_eq!(data.len(), shape.len(), "tensor buffer does not match shape");
        Tensor { shape, data }
    }

    pub fn flat(data: Vec<f64>) -> Tensor {
        Tensor { shape: Shape::flat(data.len()), data }
    }

    #[inline]
    pub fn index(&self, y: usize, x: usize, c: usize) -> usize {
        (y * self.shape.width + x) * self.shape.channels + c
    }

    #[inline]
    pub fn at(&self, y: usize, x: usize, c: usize) -> f64 {
        self.data[self.index(y, x, c)]
    }

    /// Reinterprets the buffer under a new shape of the same length.
    pub fn reshape(self, shape: Shape) -> Tensor {
        assert_eq!(self.data.len(), shape.len(), "reshape must preserve length");
        Tensor { shape, data: self.data }
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor { shape: self.shape, data: self.data.iter().map(|&x| functor(x)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_channels_last() {
        let t = Tensor::from_vec(Shape::new(2, 2, 2), (0..8).map(f64::from).collect());
        assert_eq!(t.at(0, 0, 1), 1.0);
        assert_eq!(t.at(0, 1, 0), 2.0);
        assert_eq!(t.at(1, 0, 0), 4.0);
        assert_eq!(t.at(1, 1, 1), 7.0);
    }

    #[test]
    fn display_matches_summary_format() {
        assert_eq!(Shape::new(28, 28, 32).to_string(), "(None, 28, 28, 32)");
        assert_eq!(Shape::flat(128).to_string(), "(None, 128)");
    }

    #[test]
    fn reshape_keeps_order() {
        let t = Tensor::from_vec(Shape::new(1, 2, 2), vec![1.0, 2.0, 3.0, 4.0]);
        let f = t.reshape(Shape::flat(4));
        assert_eq!(f.data, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(f.shape.is_flat());
    }
}
