pub mod activation_layer;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod flatten;
pub mod layer;
pub mod pooling;

pub use activation_layer::ActivationLayer;
pub use conv2d::{Conv2D, Padding};
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use layer::{Layer, ParamMut, Phase};
pub use pooling::{Pool2D, PoolKind};
