use serde::{Serialize, Deserialize};

/// Row-major `rows × cols` matrix backed by a single contiguous buffer.
///
/// Dense layers store their kernel as `(input_size × units)` so that the
/// forward pass is `z = x · W + b` for a row vector `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Wraps an existing row-major buffer. Panics if the length does not match.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Matrix {
        assert_eq!(data.len(), rows * cols, "matrix buffer has the wrong length");
        Matrix { rows, cols, data }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row vector times matrix: `x · self`, where `x.len() == rows`.
    pub fn vec_mul(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.rows, "Matrices are of incorrect sizes");
        let mut out = vec![0.0; self.cols];
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            for (o, w) in out.iter_mut().zip(self.row(i)) {
                *o += xi * w;
            }
        }
        out
    }

    /// Matrix times column vector: `self · d`, where `d.len() == cols`.
    /// Used to push a dense layer's delta back to its inputs (`δ · Wᵀ`).
    pub fn mul_vec(&self, d: &[f64]) -> Vec<f64> {
        assert_eq!(d.len(), self.cols, "Matrices are of incorrect sizes");
        (0..self.rows)
            .map(|i| self.row(i).iter().zip(d).map(|(w, di)| w * di).sum())
            .collect()
    }

    /// Accumulates the outer product `xᵀ · d` into `self`.
    pub fn add_outer(&mut self, x: &[f64], d: &[f64]) {
        assert_eq!(x.len(), self.rows);
        assert_eq!(d.len(), self.cols);
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            let start = i * self.cols;
            for (g, di) in self.data[start..start + self.cols].iter_mut().zip(d) {
                *g += xi * di;
            }
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.get(i, j);
            }
        }
        res
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
