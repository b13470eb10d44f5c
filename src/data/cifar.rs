//! CIFAR-10 binary batches: each record is one label byte followed by
//! 3072 pixel bytes stored as three 32×32 planes (R, then G, then B).

use std::path::Path;

use tracing::debug;

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::math::tensor::{Shape, Tensor};

pub const SIDE: usize = 32;
const PLANE: usize = SIDE * SIDE;
const RECORD: usize = 1 + 3 * PLANE;

pub const CLASS_NAMES: [&str; 10] = [
    "airplane", "automobile", "bird", "cat", "deer",
    "dog", "frog", "horse", "ship", "truck",
];

pub fn shape() -> Shape {
    Shape::new(SIDE, SIDE, 3)
}

/// Parses one batch into channels-last tensors of raw pixel values plus labels.
pub fn parse_cifar10_batch(bytes: &[u8]) -> Result<(Vec<Tensor>, Vec<usize>)> {
    if bytes.is_empty() || bytes.len() % RECORD != 0 {
        return Err(Error::Dataset(format!(
            "CIFAR-10 batch length {} is not a positive multiple of the {}-byte record size.",
            bytes.len(), RECORD
        )));
    }
    let mut images = Vec::with_capacity(bytes.len() / RECORD);
    let mut labels = Vec::with_capacity(bytes.len() / RECORD);
    for record in bytes.chunks_exact(RECORD) {
        labels.push(record[0] as usize);
        let planes = &record[1..];
        let mut data = Vec::with_capacity(3 * PLANE);
        for p in 0..PLANE {
            for c in 0..3 {
                data.push(planes[c * PLANE + p] as f64);
            }
        }
        images.push(Tensor::from_vec(shape(), data));
    }
    Ok((images, labels))
}

/// Loads and concatenates several batch files.
pub fn load_cifar10(paths: &[impl AsRef<Path>]) -> Result<Dataset> {
    let mut images = Vec::new();
    let mut labels = Vec::new();
    for path in paths {
        let path = path.as_ref();
        debug!(batch = %path.display(), "reading CIFAR-10 batch");
        let (imgs, lbls) = parse_cifar10_batch(&std::fs::read(path)?)?;
        images.extend(imgs);
        labels.extend(lbls);
    }
    Ok(Dataset::new(shape(), images, labels, CLASS_NAMES.len())?
        .with_class_names(CLASS_NAMES.iter().map(|s| s.to_string()).collect()))
}
