//! Storage account clients for blob and queue storage
//!
//! A descriptor value is either a service URI, used with the ambient managed
//! identity, or a storage connection string. Nothing is contacted when a
//! client is built; endpoints are derived on demand.

use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::infrastructure::config::{parse_bool, AppConfig};

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const EMULATOR_ACCOUNT: &str = "devstoreaccount1";
const EMULATOR_HOST: &str = "127.0.0.1";

/// Storage service a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageService {
    Blob,
    Queue,
}

impl StorageService {
    fn endpoint_setting(&self) -> &'static str {
        match self {
            StorageService::Blob => "blobendpoint",
            StorageService::Queue => "queueendpoint",
        }
    }

    fn subdomain(&self) -> &'static str {
        match self {
            StorageService::Blob => "blob",
            StorageService::Queue => "queue",
        }
    }

    fn emulator_port(&self) -> u16 {
        match self {
            StorageService::Blob => 10000,
            StorageService::Queue => 10001,
        }
    }
}

impl fmt::Display for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageService::Blob => f.write_str("blob"),
            StorageService::Queue => f.write_str("queue"),
        }
    }
}

/// How a storage client authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredential {
    /// Service URI paired with the ambient managed identity
    ManagedIdentity { service_uri: Url },
    /// Opaque connection string carrying its own secret
    ConnectionString(String),
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageCredential::ManagedIdentity { service_uri } => f
                .debug_struct("ManagedIdentity")
                .field("service_uri", &service_uri.as_str())
                .finish(),
            StorageCredential::ConnectionString(_) => {
                f.debug_tuple("ConnectionString").field(&"<redacted>").finish()
            }
        }
    }
}

/// Raw descriptor read from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDescriptor {
    pub value: String,
    pub prefer_managed_identity: bool,
}

impl StorageDescriptor {
    pub fn new(value: impl Into<String>, prefer_managed_identity: bool) -> Self {
        Self {
            value: value.into(),
            prefer_managed_identity,
        }
    }

    /// Read a descriptor from configuration. Managed identity is always preferred.
    pub fn from_config(config: &AppConfig, key: &str) -> Option<Self> {
        config.get(key).map(|value| Self::new(value, true))
    }

    /// Pick the authentication path.
    ///
    /// The URI path is taken only when managed identity is preferred and the
    /// value parses as an absolute URI. Every other case treats the value as
    /// a connection string, including malformed URIs.
    pub fn credential(&self) -> StorageCredential {
        if self.prefer_managed_identity {
            if let Ok(service_uri) = Url::parse(self.value.trim()) {
                return StorageCredential::ManagedIdentity { service_uri };
            }
        }
        StorageCredential::ConnectionString(self.value.clone())
    }
}

/// Client bound to one storage service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClient {
    service: StorageService,
    credential: StorageCredential,
}

impl StorageClient {
    pub fn new(service: StorageService, descriptor: &StorageDescriptor) -> Self {
        let credential = descriptor.credential();
        match &credential {
            StorageCredential::ManagedIdentity { service_uri } => {
                tracing::info!("{} storage client: managed identity for {}", service, service_uri)
            }
            StorageCredential::ConnectionString(_) => {
                tracing::info!("{} storage client: connection string", service)
            }
        }
        Self {
            service,
            credential,
        }
    }

    pub fn service(&self) -> StorageService {
        self.service
    }

    pub fn credential(&self) -> &StorageCredential {
        &self.credential
    }

    pub fn uses_managed_identity(&self) -> bool {
        matches!(self.credential, StorageCredential::ManagedIdentity { .. })
    }

    /// Service endpoint, derived from the URI or the connection string settings
    pub fn endpoint(&self) -> Option<Url> {
        match &self.credential {
            StorageCredential::ManagedIdentity { service_uri } => Some(service_uri.clone()),
            StorageCredential::ConnectionString(value) => {
                let settings = connection_string_settings(value);

                if uses_development_storage(&settings) {
                    let url = format!(
                        "http://{}:{}/{}",
                        EMULATOR_HOST,
                        self.service.emulator_port(),
                        EMULATOR_ACCOUNT
                    );
                    return Url::parse(&url).ok();
                }

                if let Some(explicit) = settings.get(self.service.endpoint_setting()) {
                    return Url::parse(explicit).ok();
                }

                let account = settings.get("accountname")?;
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL);
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                Url::parse(&format!(
                    "{}://{}.{}.{}",
                    protocol,
                    account,
                    self.service.subdomain(),
                    suffix
                ))
                .ok()
            }
        }
    }

    /// Storage account name, when the descriptor carries one
    pub fn account_name(&self) -> Option<String> {
        match &self.credential {
            StorageCredential::ManagedIdentity { service_uri } => {
                let host = service_uri.host_str()?;
                if host == EMULATOR_HOST || host == "localhost" {
                    return service_uri
                        .path_segments()?
                        .next()
                        .filter(|s| !s.is_empty())
                        .map(str::to_string);
                }
                host.split('.').next().map(str::to_string)
            }
            StorageCredential::ConnectionString(value) => {
                let settings = connection_string_settings(value);
                if uses_development_storage(&settings) {
                    return Some(EMULATOR_ACCOUNT.to_string());
                }
                settings.get("accountname").cloned()
            }
        }
    }
}

/// Build the blob storage client for a descriptor
pub fn add_blob_service_client(descriptor: &StorageDescriptor) -> StorageClient {
    StorageClient::new(StorageService::Blob, descriptor)
}

/// Build the queue storage client for a descriptor
pub fn add_queue_service_client(descriptor: &StorageDescriptor) -> StorageClient {
    StorageClient::new(StorageService::Queue, descriptor)
}

/// Split `Key=Value;Key=Value` into lowercase keys. Values keep any `=`.
fn connection_string_settings(value: &str) -> HashMap<String, String> {
    value
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn uses_development_storage(settings: &HashMap<String, String>) -> bool {
    settings
        .get("usedevelopmentstorage")
        .and_then(|v| parse_bool(v))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT_CONNECTION_STRING: &str =
        "DefaultEndpointsProtocol=https;AccountName=fibostore;AccountKey=c2VjcmV0a2V5==;EndpointSuffix=core.windows.net";

    #[test]
    fn test_identity_preferred_with_absolute_uri() {
        let descriptor = StorageDescriptor::new("https://fibostore.blob.core.windows.net", true);
        let client = add_blob_service_client(&descriptor);

        assert!(client.uses_managed_identity());
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://fibostore.blob.core.windows.net/"
        );
        assert_eq!(client.account_name().as_deref(), Some("fibostore"));
    }

    #[test]
    fn test_identity_preferred_with_connection_string_falls_back() {
        let descriptor = StorageDescriptor::new(ACCOUNT_CONNECTION_STRING, true);
        let client = add_queue_service_client(&descriptor);

        assert!(!client.uses_managed_identity());
        assert_eq!(
            client.credential(),
            &StorageCredential::ConnectionString(ACCOUNT_CONNECTION_STRING.to_string())
        );
    }

    #[test]
    fn test_identity_not_preferred_ignores_uri() {
        let descriptor = StorageDescriptor::new("https://fibostore.queue.core.windows.net", false);
        let client = add_queue_service_client(&descriptor);

        assert!(!client.uses_managed_identity());
    }

    #[test]
    fn test_malformed_uri_is_treated_as_connection_string() {
        let descriptor = StorageDescriptor::new("https://", true);
        assert!(matches!(
            descriptor.credential(),
            StorageCredential::ConnectionString(_)
        ));
    }

    #[test]
    fn test_clients_decide_independently() {
        let blob = add_blob_service_client(&StorageDescriptor::new(
            "https://fibostore.blob.core.windows.net",
            true,
        ));
        let queue = add_queue_service_client(&StorageDescriptor::new(ACCOUNT_CONNECTION_STRING, true));

        assert!(blob.uses_managed_identity());
        assert!(!queue.uses_managed_identity());
        assert_eq!(blob.service(), StorageService::Blob);
        assert_eq!(queue.service(), StorageService::Queue);
    }

    #[test]
    fn test_endpoint_from_account_settings() {
        let descriptor = StorageDescriptor::new(ACCOUNT_CONNECTION_STRING, true);

        let blob = add_blob_service_client(&descriptor);
        let queue = add_queue_service_client(&descriptor);

        assert_eq!(
            blob.endpoint().unwrap().as_str(),
            "https://fibostore.blob.core.windows.net/"
        );
        assert_eq!(
            queue.endpoint().unwrap().as_str(),
            "https://fibostore.queue.core.windows.net/"
        );
        assert_eq!(queue.account_name().as_deref(), Some("fibostore"));
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let descriptor = StorageDescriptor::new(
            "AccountName=fibostore;AccountKey=a2V5;QueueEndpoint=https://queues.internal.example/",
            false,
        );
        let client = add_queue_service_client(&descriptor);
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://queues.internal.example/"
        );
    }

    #[test]
    fn test_development_storage_endpoints() {
        let descriptor = StorageDescriptor::new("UseDevelopmentStorage=true", true);

        assert_eq!(
            add_blob_service_client(&descriptor).endpoint().unwrap().as_str(),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
        assert_eq!(
            add_queue_service_client(&descriptor).endpoint().unwrap().as_str(),
            "http://127.0.0.1:10001/devstoreaccount1"
        );
        assert_eq!(
            add_queue_service_client(&descriptor).account_name().as_deref(),
            Some("devstoreaccount1")
        );
    }

    #[test]
    fn test_connection_string_without_account_has_no_endpoint() {
        let client = add_blob_service_client(&StorageDescriptor::new("not a connection string", true));
        assert_eq!(client.endpoint(), None);
        assert_eq!(client.account_name(), None);
    }

    #[test]
    fn test_debug_redacts_connection_string() {
        let client = add_queue_service_client(&StorageDescriptor::new(ACCOUNT_CONNECTION_STRING, false));
        assert!(!format!("{:?}", client).contains("c2VjcmV0a2V5"));
    }
}
