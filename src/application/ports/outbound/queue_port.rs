use async_trait::async_trait;

use crate::domain::value_objects::QueueMessage;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Command error: {0}")]
    Command(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Queue backend capability shared by every backend implementation
///
/// Implementations are constructed once at startup and shared across
/// request handlers, so they must be safe to call concurrently.
#[async_trait]
pub trait QueuePort: Send + Sync {
    /// Append a payload to the tail of the named queue
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<QueueMessage, QueueError>;

    /// Remove and return the oldest message of the named queue
    async fn dequeue(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError>;

    /// Number of messages waiting in the named queue
    async fn depth(&self, queue: &str) -> Result<usize, QueueError>;

    /// Round-trip to the backing store
    async fn health_check(&self) -> Result<bool, QueueError>;

    /// Release connections. Called once at process termination.
    async fn shutdown(&self);
}
