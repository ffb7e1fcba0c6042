//! Value objects - Immutable objects defined by their attributes

mod backend;
mod queue_message;
mod settings;

pub use backend::BackendKind;
pub use queue_message::{MessageId, QueueMessage};
pub use settings::{PlainSettings, SecureSettings, ServiceSettings};
