use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::cifar;
use crate::data::dataset::Dataset;
use crate::data::idx::load_idx_pair;
use crate::error::{Error, Result};
use crate::math::tensor::Shape;

const FASHION_NAMES: [&str; 10] = [
    "T-shirt/top", "Trouser", "Pullover", "Dress", "Coat",
    "Sandal", "Shirt", "Sneaker", "Bag", "Ankle boot",
];

/// The standard benchmark datasets that can be read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    #[default]
    Mnist,
    FashionMnist,
    Cifar10,
}

impl DatasetKind {
    pub fn input_shape(self) -> Shape {
        match self {
            DatasetKind::Mnist | DatasetKind::FashionMnist => Shape::new(28, 28, 1),
            DatasetKind::Cifar10 => cifar::shape(),
        }
    }

    pub fn num_classes(self) -> usize {
        10
    }

    pub fn class_names(self) -> Vec<String> {
        match self {
            DatasetKind::Mnist => (0..10).map(|d| d.to_string()).collect(),
            DatasetKind::FashionMnist => FASHION_NAMES.iter().map(|s| s.to_string()).collect(),
            DatasetKind::Cifar10 => cifar::CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Mnist => "MNIST",
            DatasetKind::FashionMnist => "Fashion-MNIST",
            DatasetKind::Cifar10 => "CIFAR-10",
        }
    }

    /// Reads the standard train and test files from `dir`, returning
    /// `(train, test)` with raw 0-255 pixel values.
    pub fn load(self, dir: &Path) -> Result<(Dataset, Dataset)> {
        info!(dataset = self.name(), dir = %dir.display(), "loading dataset");
        let train = self.load_split(dir, Split::Train)?;
        let test = self.load_split(dir, Split::Test)?;
        info!(train = train.len(), test = test.len(), "dataset loaded");
        Ok((train, test))
    }

    /// Reads only the test split, for inference on a saved model.
    pub fn load_test(self, dir: &Path) -> Result<Dataset> {
        self.load_split(dir, Split::Test)
    }

    fn load_split(self, dir: &Path, split: Split) -> Result<Dataset> {
        let data = match self {
            DatasetKind::Mnist | DatasetKind::FashionMnist => {
                let prefix = match split {
                    Split::Train => "train",
                    Split::Test => "t10k",
                };
                load_idx_pair(
                    &find(dir, &[&format!("{}-images-idx3-ubyte", prefix), &format!("{}-images.idx3-ubyte", prefix)])?,
                    &find(dir, &[&format!("{}-labels-idx1-ubyte", prefix), &format!("{}-labels.idx1-ubyte", prefix)])?,
                    self.num_classes(),
                )?
            }
            DatasetKind::Cifar10 => {
                let paths = match split {
                    Split::Train => (1..=5)
                        .map(|i| {
                            let name = format!("data_batch_{}.bin", i);
                            find(dir, &[&name, &format!("cifar-10-batches-bin/{}", name)])
                        })
                        .collect::<Result<Vec<PathBuf>>>()?,
                    Split::Test => vec![find(dir, &["test_batch.bin", "cifar-10-batches-bin/test_batch.bin"])?],
                };
                cifar::load_cifar10(&paths)?
            }
        };
        if data.shape != self.input_shape() {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", self.input_shape()),
                actual: format!("{:?}", data.shape),
            });
        }
        Ok(data.with_class_names(self.class_names()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Split {
    Train,
    Test,
}

/// First of `candidates` (relative to `dir`) that exists.
fn find<S: AsRef<str>>(dir: &Path, candidates: &[S]) -> Result<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name.as_ref()))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            let names: Vec<&str> = candidates.iter().map(|c| c.as_ref()).collect();
            Error::Dataset(format!("none of [{}] found in '{}'", names.join(", "), dir.display()))
        })
}
