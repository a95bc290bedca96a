//! Hierarchical logger tree: nodes, handles and the owning namespace

pub mod attachments;
pub mod logger;
pub mod names;
pub mod namespace;
pub mod node;

pub use attachments::AttachmentKey;
pub use logger::Logger;
pub use names::LiveNames;
pub use namespace::{LevelConfig, Namespace, NamespaceBuilder, NamespaceConfig};
pub use node::LoggerNode;
