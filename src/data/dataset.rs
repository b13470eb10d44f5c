use crate::error::{Error, Result};
use crate::math::tensor::{Shape, Tensor};

/// Labelled images that all share one shape.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub shape: Shape,
    pub images: Vec<Tensor>,
    /// Class index of each image, in `[0, num_classes)`.
    pub labels: Vec<usize>,
    pub num_classes: usize,
    pub class_names: Option<Vec<String>>,
}

impl Dataset {
    pub fn new(shape: Shape, images: Vec<Tensor>, labels: Vec<usize>, num_classes: usize) -> Result<Dataset> {
        if images.len() != labels.len() {
            return Err(Error::Dataset(format!(
                "{} images but {} labels", images.len(), labels.len()
            )));
        }
        if num_classes < 2 {
            return Err(Error::Dataset(format!("n_classes must be at least 2, got {}.", num_classes)));
        }
        if let Some(img) = images.iter().find(|img| img.shape != shape) {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", shape),
                actual: format!("{:?}", img.shape),
            });
        }
        if let Some((i, &label)) = labels.iter().enumerate().find(|(_, l)| **l >= num_classes) {
            return Err(Error::Dataset(format!(
                "label at index {}: class index {} is out of range for n_classes={}.",
                i, label, num_classes
            )));
        }
        Ok(Dataset { shape, images, labels, num_classes, class_names: None })
    }

    pub fn with_class_names(mut self, names: Vec<String>) -> Dataset {
        self.class_names = Some(names);
        self
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// One-hot vector of length `num_classes` for `label`.
    pub fn one_hot(&self, label: usize) -> Vec<f64> {
        one_hot(label, self.num_classes)
    }

    /// One-hot targets for every sample, in order.
    pub fn targets(&self) -> Vec<Vec<f64>> {
        self.labels.iter().map(|&l| self.one_hot(l)).collect()
    }

    /// Splits off the last `fraction` of samples as a validation set, before
    /// any shuffling, and returns `(train, validation)`.
    pub fn split_validation(self, fraction: f64) -> Result<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(Error::Config(format!("validation_split must be in [0, 1), got {}", fraction)));
        }
        let split_at = (self.len() as f64 * (1.0 - fraction)).floor() as usize;
        let Dataset { shape, mut images, mut labels, num_classes, class_names } = self;
        let val_images = images.split_off(split_at);
        let val_labels = labels.split_off(split_at);
        let train = Dataset { shape, images, labels, num_classes, class_names: class_names.clone() };
        let val = Dataset { shape, images: val_images, labels: val_labels, num_classes, class_names };
        Ok((train, val))
    }

    /// Keeps only the first `n` samples.
    pub fn take(mut self, n: usize) -> Dataset {
        self.images.truncate(n);
        self.labels.truncate(n);
        self
    }

    /// Human-readable name of a class, or its index when no names are known.
    pub fn class_name(&self, class: usize) -> String {
        self.class_names
            .as_ref()
            .and_then(|names| names.get(class).cloned())
            .unwrap_or_else(|| class.to_string())
    }
}

pub fn one_hot(label: usize, num_classes: usize) -> Vec<f64> {
    let mut v = vec![0.0; num_classes];
    v[label] = 1.0;
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n: usize) -> Dataset {
        let shape = Shape::new(2, 2, 1);
        let images = (0..n).map(|i| Tensor::from_vec(shape, vec![i as f64; 4])).collect();
        let labels = (0..n).map(|i| i % 3).collect();
        Dataset::new(shape, images, labels, 3).unwrap()
    }

    #[test]
    fn one_hot_has_single_bit() {
        let d = toy(3);
        assert_eq!(d.one_hot(2), vec![0.0, 0.0, 1.0]);
        assert_eq!(d.targets()[1], vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn validation_is_the_tail() {
        let (train, val) = toy(10).split_validation(0.2).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert_eq!(val.images[0].data[0], 8.0);
        assert_eq!(val.labels, vec![2, 0]);
    }

    #[test]
    fn zero_split_keeps_everything() {
        let (train, val) = toy(5).split_validation(0.0).unwrap();
        assert_eq!(train.len(), 5);
        assert!(val.is_empty());
        assert!(toy(5).split_validation(1.0).is_err());
    }

    #[test]
    fn rejects_bad_labels_and_shapes() {
        let shape = Shape::new(1, 1, 1);
        let img = Tensor::zeros(shape);
        assert!(Dataset::new(shape, vec![img.clone()], vec![5], 3).is_err());
        assert!(Dataset::new(shape, vec![img.clone()], vec![], 3).is_err());
        assert!(Dataset::new(Shape::new(2, 1, 1), vec![img], vec![0], 3).is_err());
    }
}
