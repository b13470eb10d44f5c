//! Parser for the IDX binary files used by MNIST and its derivatives
//! (Fashion-MNIST, EMNIST, …).
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index in [0, n_classes)
//! ```

use std::path::Path;

use tracing::debug;

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::math::tensor::{Shape, Tensor};

fn be_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

fn check_header(bytes: &[u8], what: &str, dims: u8, header_len: usize) -> Result<()> {
    if bytes.len() < header_len {
        return Err(Error::Dataset(format!(
            "IDX {} file too short: expected at least {} header bytes, got {}.",
            what, header_len, bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(Error::Dataset(format!(
            "IDX {} file: bytes 0-1 must be 0x00 0x00 (reserved), got 0x{:02X} 0x{:02X}.",
            what, bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(Error::Dataset(format!(
            "IDX {} file: byte 2 (dtype) must be 0x08 (uint8), got 0x{:02X}.",
            what, bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(Error::Dataset(format!(
            "IDX {} file: byte 3 (dimensions) must be {}, got {}.",
            what, dims, bytes[3]
        )));
    }
    Ok(())
}

/// Parses an IDX3 image file into single-channel tensors holding the raw
/// pixel values (0.0 to 255.0). Scaling is left to preprocessing.
pub fn parse_idx_images(bytes: &[u8]) -> Result<(Shape, Vec<Tensor>)> {
    check_header(bytes, "image", 0x03, 16)?;

    let n_items = be_u32(bytes, 4);
    let rows = be_u32(bytes, 8);
    let cols = be_u32(bytes, 12);

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        Error::Dataset(format!("IDX image file: rows * cols overflows usize (rows={}, cols={}).", rows, cols))
    })?;
    let required = n_items
        .checked_mul(n_pixels)
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| Error::Dataset("IDX image file: data length overflows usize.".to_owned()))?;

    if bytes.len() < required {
        return Err(Error::Dataset(format!(
            "IDX image file too short: header declares {} items of {}×{} pixels \
             ({} data bytes needed after header), but file is only {} bytes total.",
            n_items, rows, cols, required - 16, bytes.len()
        )));
    }
    if n_pixels == 0 {
        return Err(Error::Dataset(format!("IDX image file declares empty {}×{} images.", rows, cols)));
    }

    let shape = Shape::new(rows, cols, 1);
    let images = bytes[16..required]
        .chunks_exact(n_pixels)
        .map(|chunk| Tensor::from_vec(shape, chunk.iter().map(|&px| px as f64).collect()))
        .collect();
    Ok((shape, images))
}

/// Parses an IDX1 label file into class indices.
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<usize>> {
    check_header(bytes, "label", 0x01, 8)?;
    let n_items = be_u32(bytes, 4);
    let required = 8 + n_items;
    if bytes.len() < required {
        return Err(Error::Dataset(format!(
            "IDX label file too short: header declares {} labels but file is only {} bytes \
             (need at least {} bytes).",
            n_items, bytes.len(), required
        )));
    }
    Ok(bytes[8..required].iter().map(|&b| b as usize).collect())
}

/// Parses an image file and its label file into one dataset.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8], n_classes: usize) -> Result<Dataset> {
    let (shape, images) = parse_idx_images(image_bytes)?;
    let labels = parse_idx_labels(label_bytes)?;
    if labels.len() != images.len() {
        return Err(Error::Dataset(format!(
            "IDX file mismatch: image file declares {} items but label file declares {}.",
            images.len(), labels.len()
        )));
    }
    Dataset::new(shape, images, labels, n_classes)
}

pub fn load_idx_pair(image_path: &Path, label_path: &Path, n_classes: usize) -> Result<Dataset> {
    debug!(images = %image_path.display(), labels = %label_path.display(), "reading IDX pair");
    let image_bytes = std::fs::read(image_path)?;
    let label_bytes = std::fs::read(label_path)?;
    parse_idx_pair(&image_bytes, &label_bytes, n_classes)
}

/// Encodes images and labels as an IDX3/IDX1 pair. The inverse of
/// `parse_idx_pair` for `u8` pixel data; handy for fixtures and exports.
pub fn encode_idx_pair(rows: usize, cols: usize, pixels: &[u8], labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let n = labels.len();
    let mut images = vec![0x00, 0x00, 0x08, 0x03];
    images.extend_from_slice(&(n as u32).to_be_bytes());
    images.extend_from_slice(&(rows as u32).to_be_bytes());
    images.extend_from_slice(&(cols as u32).to_be_bytes());
    images.extend_from_slice(pixels);

    let mut label_bytes = vec![0x00, 0x00, 0x08, 0x01];
    label_bytes.extend_from_slice(&(n as u32).to_be_bytes());
    label_bytes.extend_from_slice(labels);
    (images, label_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_pair() {
        let (img, lbl) = encode_idx_pair(2, 3, &[0, 255, 10, 20, 30, 40, 1, 2, 3, 4, 5, 6], &[7, 1]);
        let ds = parse_idx_pair(&img, &lbl, 10).unwrap();
        assert_eq!(ds.shape, Shape::new(2, 3, 1));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labels, vec![7, 1]);
        assert_eq!(ds.images[0].data, vec![0.0, 255.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let (mut img, lbl) = encode_idx_pair(1, 1, &[0], &[0]);
        img[3] = 0x01;
        let err = parse_idx_pair(&img, &lbl, 10).unwrap_err().to_string();
        assert!(err.contains("dimensions"), "{}", err);
    }

    #[test]
    fn rejects_truncated_pixels() {
        let (img, lbl) = encode_idx_pair(2, 2, &[1, 2, 3], &[0]);
        let err = parse_idx_pair(&img, &lbl, 10).unwrap_err().to_string();
        assert!(err.contains("too short"), "{}", err);
    }

    #[test]
    fn rejects_count_mismatch_and_bad_label() {
        let (img, _) = encode_idx_pair(1, 1, &[0, 0], &[0, 0]);
        let (_, lbl) = encode_idx_pair(1, 1, &[0], &[0]);
        assert!(parse_idx_pair(&img, &lbl, 10).unwrap_err().to_string().contains("mismatch"));

        let (img, lbl) = encode_idx_pair(1, 1, &[0], &[12]);
        assert!(parse_idx_pair(&img, &lbl, 10).unwrap_err().to_string().contains("out of range"));
    }
}
