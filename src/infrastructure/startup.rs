//! Startup - Resolves configuration into the service registry
//!
//! Everything is resolved before anything is registered, so a failed
//! startup leaves no capability behind.

use crate::infrastructure::config::{keys, AppConfig, ConfigurationError};
use crate::infrastructure::queues::QueueFactory;
use crate::infrastructure::registry::{RegistryError, ServiceRegistry};
use crate::infrastructure::settings::resolve_service_settings;
use crate::infrastructure::storage::{
    add_blob_service_client, add_queue_service_client, StorageDescriptor,
};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Build a registry populated from configuration
pub fn configure_services(config: &AppConfig) -> Result<ServiceRegistry, StartupError> {
    let registry = ServiceRegistry::new();
    configure_registry(&registry, config)?;
    Ok(registry)
}

/// Populate an existing registry. Running this twice against the same
/// registry fails with a duplicate registration.
pub fn configure_registry(
    registry: &ServiceRegistry,
    config: &AppConfig,
) -> Result<(), StartupError> {
    let settings = resolve_service_settings(config)?;
    let backend = QueueFactory::from_config(config)?.create(&settings)?;

    let blob_storage = StorageDescriptor::from_config(config, keys::BLOB_STORAGE)
        .map(|d| add_blob_service_client(&d));
    let queue_storage = StorageDescriptor::from_config(config, keys::QUEUE_STORAGE)
        .map(|d| add_queue_service_client(&d));

    registry.register_settings(settings)?;
    registry.register_queue_backend(backend)?;

    match blob_storage {
        Some(client) => {
            registry.register_blob_storage(client)?;
        }
        None => tracing::warn!("{} is not configured, blob storage disabled", keys::BLOB_STORAGE),
    }
    match queue_storage {
        Some(client) => {
            registry.register_queue_storage(client)?;
        }
        None => tracing::warn!("{} is not configured, queue storage disabled", keys::QUEUE_STORAGE),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{BackendKind, SecureSettings, ServiceSettings};
    use crate::infrastructure::registry::Capability;
    use crate::infrastructure::storage::StorageCredential;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        AppConfig::from_pairs(pairs.iter().copied())
    }

    fn secure_redis() -> AppConfig {
        config(&[
            ("Transform", "true"),
            ("ConnectionString", "cs1"),
            ("Password", "p1"),
            ("Algorithm", "AES"),
            ("Service", "Redis"),
        ])
    }

    #[test]
    fn test_secure_redis_startup() {
        let registry = configure_services(&secure_redis()).unwrap();

        assert_eq!(
            *registry.settings().unwrap(),
            ServiceSettings::Secure(SecureSettings {
                connection_string: "cs1".to_string(),
                password: "p1".to_string(),
                algorithm: "AES".to_string(),
            })
        );

        let backend = registry.queue_backend().unwrap();
        assert_eq!(backend.kind(), BackendKind::Redis);
        assert!(std::sync::Arc::ptr_eq(&backend, &registry.queue_backend().unwrap()));
    }

    #[test]
    fn test_plain_mongodb_startup() {
        let registry = configure_services(&config(&[
            ("Transform", "false"),
            ("ConnectionString", "mongodb://localhost:27017/queues"),
            ("Service", "MongoDB"),
        ]))
        .unwrap();

        let settings = registry.settings().unwrap();
        assert!(!settings.is_secure());
        assert_eq!(registry.queue_backend().unwrap().kind(), BackendKind::MongoDB);
    }

    #[test]
    fn test_unrecognized_service_fails_startup() {
        let err = configure_services(&config(&[
            ("Transform", "false"),
            ("ConnectionString", "cs1"),
            ("Service", "Memcached"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            StartupError::Configuration(ConfigurationError::Invalid { key: "Service", ref value, .. })
                if value == "Memcached"
        ));
    }

    #[test]
    fn test_failed_startup_registers_nothing() {
        let registry = ServiceRegistry::new();
        let result = configure_registry(
            &registry,
            &config(&[
                ("Transform", "true"),
                ("ConnectionString", "cs1"),
                ("Algorithm", "AES"),
                ("Service", "Memcached"),
            ]),
        );

        assert!(result.is_err());
        assert_eq!(
            registry.settings().unwrap_err(),
            RegistryError::NotInitialized(Capability::ServiceSettings)
        );
    }

    #[test]
    fn test_unparseable_transform_fails_startup() {
        let registry = ServiceRegistry::new();
        let err = configure_registry(
            &registry,
            &config(&[("Transform", "sometimes"), ("ConnectionString", "cs1"), ("Service", "Redis")]),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            StartupError::Configuration(ConfigurationError::Invalid { key: "Transform", .. })
        ));
        assert!(registry.settings().is_err());
        assert!(registry.queue_backend().is_err());
    }

    #[test]
    fn test_configuring_twice_is_duplicate_registration() {
        let registry = ServiceRegistry::new();
        configure_registry(&registry, &secure_redis()).unwrap();

        let err = configure_registry(&registry, &secure_redis()).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Registry(RegistryError::DuplicateRegistration(
                Capability::ServiceSettings
            ))
        ));
    }

    #[test]
    fn test_storage_clients_are_registered_when_configured() {
        let registry = configure_services(&config(&[
            ("Transform", "false"),
            ("ConnectionString", "cs1"),
            ("Service", "Redis"),
            ("ConnectionStrings:LocalDBTesting:blob", "https://fibostore.blob.core.windows.net"),
            ("ConnectionStrings:LocalDBTesting:queue", "UseDevelopmentStorage=true"),
        ]))
        .unwrap();

        let blob = registry.blob_storage().unwrap();
        assert!(matches!(blob.credential(), StorageCredential::ManagedIdentity { .. }));

        let queue = registry.queue_storage().unwrap();
        assert!(!queue.uses_managed_identity());
    }

    #[test]
    fn test_storage_clients_are_optional() {
        let registry = configure_services(&secure_redis()).unwrap();
        assert_eq!(
            registry.blob_storage().unwrap_err(),
            RegistryError::NotInitialized(Capability::BlobStorage)
        );
        assert_eq!(
            registry.queue_storage().unwrap_err(),
            RegistryError::NotInitialized(Capability::QueueStorage)
        );
    }

    #[test]
    fn test_error_message_names_the_key() {
        let err = configure_services(&config(&[("ConnectionString", "cs1"), ("Service", "Redis")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Configuration key 'Transform' is required");
    }
}
