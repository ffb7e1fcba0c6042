//! Application configuration
//!
//! Values are layered from an optional `appsettings` file, an optional
//! `appsettings.{environment}` file, an optional `appsettings.secrets` file
//! (Development only) and the process environment, later layers winning. Hierarchical keys are addressed with `:` paths
//! (`ConnectionStrings:LocalDBTesting:blob`); environment variables spell the
//! separator as `__`. Lookups are case-insensitive.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use config::{Config, File, Map, Source, Value, ValueKind};

/// Configuration keys read at startup
pub mod keys {
    pub const TRANSFORM: &str = "Transform";
    pub const CONNECTION_STRING: &str = "ConnectionString";
    pub const PASSWORD: &str = "Password";
    pub const ALGORITHM: &str = "Algorithm";
    pub const SERVICE: &str = "Service";
    pub const BLOB_STORAGE: &str = "ConnectionStrings:LocalDBTesting:blob";
    pub const QUEUE_STORAGE: &str = "ConnectionStrings:LocalDBTesting:queue";
}

/// Variable selecting the environment-specific settings file
const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";
const DEFAULT_ENVIRONMENT: &str = "Production";
const DEVELOPMENT_ENVIRONMENT: &str = "Development";
const SETTINGS_FILE: &str = "appsettings";
/// Local secrets kept out of the checked-in settings files
const SECRETS_FILE: &str = "appsettings.secrets";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Configuration key '{key}' is required")]
    Missing { key: &'static str },
    #[error("Configuration key '{key}' has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Flattened, read-only view over every configuration layer
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    values: HashMap<String, String>,
    environment: String,
}

impl AppConfig {
    /// Load configuration from the working directory and the process environment
    pub fn load() -> Result<Self, ConfigurationError> {
        let environment =
            env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
        let vars = env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));

        Self::load_from(Path::new("."), &environment, vars)
    }

    /// Load settings files from `dir` for `environment`, then overlay `vars`
    pub fn load_from<I>(dir: &Path, environment: &str, vars: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self {
            values: HashMap::new(),
            environment: environment.to_string(),
        };
        let settings_file = |name: &str| {
            File::with_name(&dir.join(name).to_string_lossy()).required(false)
        };

        let mut builder = Config::builder()
            .add_source(settings_file(SETTINGS_FILE))
            .add_source(settings_file(&format!("{SETTINGS_FILE}.{environment}")));
        if config.is_development() {
            builder = builder.add_source(settings_file(SECRETS_FILE));
        }

        let files = builder
            .build()
            .and_then(|c| c.collect())
            .map_err(|e| ConfigurationError::Load(e.to_string()))?;
        flatten_into("", files, &mut config.values);

        for (name, value) in vars {
            config
                .values
                .insert(normalize_key(&name.replace(ENV_SEPARATOR, ":")), value);
        }

        tracing::debug!(
            "Loaded {} configuration values for environment {}",
            config.values.len(),
            config.environment
        );

        Ok(config)
    }

    /// Build a configuration from explicit `(key, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
                .collect(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEVELOPMENT_ENVIRONMENT)
    }

    /// Look up a value. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize_key(key))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &'static str) -> Result<&str, ConfigurationError> {
        self.get(key).ok_or(ConfigurationError::Missing { key })
    }

    /// Read a required boolean flag
    pub fn flag(&self, key: &'static str) -> Result<bool, ConfigurationError> {
        let raw = self.require(key)?;
        parse_bool(raw).ok_or_else(|| ConfigurationError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected 'true' or 'false'".to_string(),
        })
    }
}

/// Parse `true`/`false` ignoring ASCII case and surrounding whitespace
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn normalize_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

fn flatten_into(prefix: &str, table: Map<String, Value>, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}:{key}")
        };

        match value.kind {
            ValueKind::Table(nested) => flatten_into(&path, nested, out),
            ValueKind::Nil | ValueKind::Array(_) => {}
            scalar => {
                if let Ok(s) = Value::new(None, scalar).into_string() {
                    out.insert(normalize_key(&path), s);
                }
            }
        }
    }
}
