//! Queue factory - Creates the queue backend selected by configuration
//!
//! The `Service` key names exactly one backend. Anything other than a known
//! backend name is a configuration error; the process never starts without
//! a queue backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::outbound::{QueueError, QueuePort};
use crate::domain::value_objects::{BackendKind, QueueMessage, ServiceSettings};
use crate::infrastructure::config::{keys, AppConfig, ConfigurationError};
use crate::infrastructure::queues::{MongoQueue, RedisQueue};

/// Enum wrapper for queue backends to enable runtime selection
pub enum QueueBackend {
    Redis(RedisQueue),
    Mongo(MongoQueue),
}

impl QueueBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            QueueBackend::Redis(_) => BackendKind::Redis,
            QueueBackend::Mongo(_) => BackendKind::MongoDB,
        }
    }
}

impl std::fmt::Debug for QueueBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("QueueBackend").field(&self.kind()).finish()
    }
}

#[async_trait]
impl QueuePort for QueueBackend {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<QueueMessage, QueueError> {
        match self {
            QueueBackend::Redis(q) => q.enqueue(queue, payload).await,
            QueueBackend::Mongo(q) => q.enqueue(queue, payload).await,
        }
    }

    async fn dequeue(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError> {
        match self {
            QueueBackend::Redis(q) => q.dequeue(queue).await,
            QueueBackend::Mongo(q) => q.dequeue(queue).await,
        }
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        match self {
            QueueBackend::Redis(q) => q.depth(queue).await,
            QueueBackend::Mongo(q) => q.depth(queue).await,
        }
    }

    async fn health_check(&self) -> Result<bool, QueueError> {
        match self {
            QueueBackend::Redis(q) => q.health_check().await,
            QueueBackend::Mongo(q) => q.health_check().await,
        }
    }

    async fn shutdown(&self) {
        match self {
            QueueBackend::Redis(q) => q.shutdown().await,
            QueueBackend::Mongo(q) => q.shutdown().await,
        }
    }
}

/// Queue factory for creating the configured backend
#[derive(Debug, Clone, Copy)]
pub struct QueueFactory {
    kind: BackendKind,
}

impl QueueFactory {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    /// Read the backend selector from the `Service` key
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigurationError> {
        let service = config.require(keys::SERVICE)?;
        let kind = BackendKind::from_config_value(service).ok_or_else(|| {
            ConfigurationError::Invalid {
                key: keys::SERVICE,
                value: service.to_string(),
                reason: format!(
                    "unsupported queue backend, expected one of {}",
                    BackendKind::ALL.map(|k| k.as_str()).join(", ")
                ),
            }
        })?;

        Ok(Self::new(kind))
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Create the queue backend. No connection is opened here.
    pub fn create(&self, settings: &ServiceSettings) -> Result<Arc<QueueBackend>, ConfigurationError> {
        let backend = match self.kind {
            BackendKind::Redis => QueueBackend::Redis(RedisQueue::new(settings)?),
            BackendKind::MongoDB => QueueBackend::Mongo(MongoQueue::new(settings)?),
        };

        tracing::info!("Queue backend: {}", self.kind);
        Ok(Arc::new(backend))
    }
}
