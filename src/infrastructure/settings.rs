//! Settings resolution - Picks the plain or secure settings shape

use crate::domain::value_objects::{PlainSettings, SecureSettings, ServiceSettings};
use crate::infrastructure::config::{keys, AppConfig, ConfigurationError};

/// Resolve the settings shape from the `Transform` flag.
///
/// `Transform=true` selects the secure shape and requires `Algorithm`.
/// `ConnectionString` is required by both shapes; an absent `Password`
/// resolves to an empty credential.
pub fn resolve_service_settings(config: &AppConfig) -> Result<ServiceSettings, ConfigurationError> {
    let transform = config.flag(keys::TRANSFORM)?;
    let connection_string = config.require(keys::CONNECTION_STRING)?.to_string();
    let password = config.get(keys::PASSWORD).unwrap_or_default().to_string();

    let settings = if transform {
        let algorithm = config.require(keys::ALGORITHM)?.trim().to_string();
        tracing::info!("Using secure settings (algorithm: {})", algorithm);
        ServiceSettings::Secure(SecureSettings {
            connection_string,
            password,
            algorithm,
        })
    } else {
        if config.get(keys::ALGORITHM).is_some() {
            tracing::warn!("Algorithm is configured but Transform is false, ignoring it");
        }
        tracing::info!("Using plain settings");
        ServiceSettings::Plain(PlainSettings {
            connection_string,
            password,
        })
    };

    if settings.password().is_empty() {
        tracing::warn!("No password configured for the backing store");
    }

    Ok(settings)
}
