//! Error type shared by every stage of the pipeline.

use thiserror::Error;

/// Errors raised while loading data, building, training or persisting a model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// A dataset file is malformed or inconsistent.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// The model architecture cannot be built as described.
    #[error("invalid model spec: {0}")]
    InvalidSpec(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
