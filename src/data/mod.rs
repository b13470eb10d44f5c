pub mod cifar;
pub mod dataset;
pub mod idx;
pub mod kind;
pub mod preprocess;

pub use dataset::{one_hot, Dataset};
pub use kind::DatasetKind;
pub use preprocess::{Preprocessing, Scaling};
