pub mod metadata;
pub mod network;
pub mod spec;
pub mod summary;

pub use metadata::{InputType, ModelMetadata};
pub use network::Network;
pub use spec::{LayerSpec, ModelSpec};
pub use summary::{Summary, SummaryRow};
