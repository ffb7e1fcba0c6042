//! Process-wide service registry
//!
//! Holds the single instance of each capability resolved at startup. Every
//! slot is written at most once and then only read, so the registry can be
//! shared behind an `Arc` across request handlers without locking.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::application::ports::outbound::QueuePort;
use crate::domain::value_objects::ServiceSettings;
use crate::infrastructure::queues::QueueBackend;
use crate::infrastructure::storage::StorageClient;

/// Capabilities held by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ServiceSettings,
    QueueBackend,
    BlobStorage,
    QueueStorage,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ServiceSettings => "service settings",
            Capability::QueueBackend => "queue backend",
            Capability::BlobStorage => "blob storage client",
            Capability::QueueStorage => "queue storage client",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} is already registered")]
    DuplicateRegistration(Capability),
    #[error("{0} is not initialized")]
    NotInitialized(Capability),
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    settings: OnceLock<Arc<ServiceSettings>>,
    queue_backend: OnceLock<Arc<QueueBackend>>,
    blob_storage: OnceLock<Arc<StorageClient>>,
    queue_storage: OnceLock<Arc<StorageClient>>,
    shut_down: AtomicBool,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_settings(
        &self,
        settings: ServiceSettings,
    ) -> Result<Arc<ServiceSettings>, RegistryError> {
        register(&self.settings, Arc::new(settings), Capability::ServiceSettings)
    }

    pub fn settings(&self) -> Result<Arc<ServiceSettings>, RegistryError> {
        resolve(&self.settings, Capability::ServiceSettings)
    }

    pub fn register_queue_backend(
        &self,
        backend: Arc<QueueBackend>,
    ) -> Result<Arc<QueueBackend>, RegistryError> {
        register(&self.queue_backend, backend, Capability::QueueBackend)
    }

    pub fn queue_backend(&self) -> Result<Arc<QueueBackend>, RegistryError> {
        resolve(&self.queue_backend, Capability::QueueBackend)
    }

    pub fn register_blob_storage(
        &self,
        client: StorageClient,
    ) -> Result<Arc<StorageClient>, RegistryError> {
        register(&self.blob_storage, Arc::new(client), Capability::BlobStorage)
    }

    pub fn blob_storage(&self) -> Result<Arc<StorageClient>, RegistryError> {
        resolve(&self.blob_storage, Capability::BlobStorage)
    }

    pub fn register_queue_storage(
        &self,
        client: StorageClient,
    ) -> Result<Arc<StorageClient>, RegistryError> {
        register(&self.queue_storage, Arc::new(client), Capability::QueueStorage)
    }

    pub fn queue_storage(&self) -> Result<Arc<StorageClient>, RegistryError> {
        resolve(&self.queue_storage, Capability::QueueStorage)
    }

    /// Ping the queue backend. Backend errors are reported as unhealthy.
    pub async fn health_check(&self) -> Result<bool, RegistryError> {
        let backend = self.queue_backend()?;
        match backend.health_check().await {
            Ok(healthy) => Ok(healthy),
            Err(e) => {
                tracing::warn!("Queue backend health check failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Drain the queue backend. Only the first call does any work; returns
    /// whether this call performed the shutdown.
    pub async fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(backend) = self.queue_backend.get() {
            backend.shutdown().await;
        }
        tracing::info!("Service registry shut down");
        true
    }
}

fn register<T>(
    slot: &OnceLock<Arc<T>>,
    value: Arc<T>,
    capability: Capability,
) -> Result<Arc<T>, RegistryError> {
    slot.set(Arc::clone(&value))
        .map_err(|_| RegistryError::DuplicateRegistration(capability))?;
    tracing::debug!("Registered {}", capability);
    Ok(value)
}

fn resolve<T>(slot: &OnceLock<Arc<T>>, capability: Capability) -> Result<Arc<T>, RegistryError> {
    slot.get()
        .cloned()
        .ok_or(RegistryError::NotInitialized(capability))
}
