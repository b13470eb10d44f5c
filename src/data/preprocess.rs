use serde::{Serialize, Deserialize};

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// Pixel scaling applied to raw 0-255 images before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    /// Divide by 255 so pixels lie in [0, 1].
    #[default]
    Normalize,
    /// Subtract the training-set mean and divide by its standard deviation.
    Standardize,
    None,
}

/// The affine map `x ↦ (x - offset) / scale` that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub offset: f64,
    pub scale: f64,
}

impl Scaling {
    pub const IDENTITY: Scaling = Scaling { offset: 0.0, scale: 1.0 };

    pub fn apply_tensor(&self, image: &mut Tensor) {
        if *self == Scaling::IDENTITY {
            return;
        }
        for x in image.data.iter_mut() {
            *x = (*x - self.offset) / self.scale;
        }
    }

    pub fn apply(&self, data: &mut Dataset) {
        for img in data.images.iter_mut() {
            self.apply_tensor(img);
        }
    }
}

impl Preprocessing {
    /// Derives the scaling from raw training pixels.
    pub fn fit(self, train: &Dataset) -> Result<Scaling> {
        match self {
            Preprocessing::Normalize => Ok(Scaling { offset: 0.0, scale: 255.0 }),
            Preprocessing::None => Ok(Scaling::IDENTITY),
            Preprocessing::Standardize => {
                let (mean, std) = mean_std(train);
                if !(std > 0.0) {
                    return Err(Error::Dataset(
                        "cannot standardize: training pixels have zero variance".into(),
                    ));
                }
                Ok(Scaling { offset: mean, scale: std })
            }
        }
    }

    /// Fits the scaling on `train` and applies it to `train` and `test`.
    pub fn apply(self, train: &mut Dataset, test: &mut Dataset) -> Result<Scaling> {
        let scaling = self.fit(train)?;
        scaling.apply(train);
        scaling.apply(test);
        Ok(scaling)
    }
}

/// Scalar mean and population standard deviation over every pixel.
fn mean_std(ds: &Dataset) -> (f64, f64) {
    let n: usize = ds.images.iter().map(|img| img.data.len()).sum();
    if n == 0 {
        return (0.0, 0.0);
    }
    let sum: f64 = ds.images.iter().flat_map(|img| img.data.iter()).sum();
    let mean = sum / n as f64;
    let var = ds.images.iter()
        .flat_map(|img| img.data.iter())
        .map(|x| (x - mean).powi(2))
        .sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Shape;

    fn pair() -> (Dataset, Dataset) {
        let shape = Shape::new(1, 2, 1);
        let train = Dataset::new(
            shape,
            vec![Tensor::from_vec(shape, vec![0.0, 255.0]), Tensor::from_vec(shape, vec![51.0, 204.0])],
            vec![0, 1],
            2,
        ).unwrap();
        let test = Dataset::new(shape, vec![Tensor::from_vec(shape, vec![102.0, 153.0])], vec![1], 2).unwrap();
        (train, test)
    }

    #[test]
    fn normalize_scales_to_unit_range() {
        let (mut train, mut test) = pair();
        Preprocessing::Normalize.apply(&mut train, &mut test).unwrap();
        assert_eq!(train.images[0].data, vec![0.0, 1.0]);
        assert!((test.images[0].data[0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn standardize_uses_training_statistics() {
        let (mut train, mut test) = pair();
        let s = Preprocessing::Standardize.apply(&mut train, &mut test).unwrap();
        assert!((s.offset - 127.5).abs() < 1e-12);
        let all: Vec<f64> = train.images.iter().flat_map(|i| i.data.clone()).collect();
        let mean = all.iter().sum::<f64>() / all.len() as f64;
        assert!(mean.abs() < 1e-12);
        // Test pixels are mapped with the training mean, not their own.
        assert!((test.images[0].data[0] - (102.0 - 127.5) / s.scale).abs() < 1e-12);
    }

    #[test]
    fn constant_images_cannot_be_standardized() {
        let shape = Shape::new(1, 1, 1);
        let mut train = Dataset::new(shape, vec![Tensor::from_vec(shape, vec![3.0]); 2], vec![0, 1], 2).unwrap();
        let mut test = train.clone();
        assert!(Preprocessing::Standardize.apply(&mut train, &mut test).is_err());
    }
}
