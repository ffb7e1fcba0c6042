//! Backing-store settings value objects
//!
//! A process runs with exactly one settings shape. The plain shape carries a
//! connection string and a credential; the secure shape additionally names
//! the symmetric cipher protecting that credential.

use std::fmt;

/// Settings for a backing store whose credential is stored as-is
#[derive(Clone, PartialEq, Eq)]
pub struct PlainSettings {
    pub connection_string: String,
    pub password: String,
}

/// Settings for a backing store whose credential is protected by a symmetric cipher
#[derive(Clone, PartialEq, Eq)]
pub struct SecureSettings {
    pub connection_string: String,
    pub password: String,
    /// Name of the symmetric cipher, e.g. `AES`
    pub algorithm: String,
}

/// The settings shape chosen at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSettings {
    Plain(PlainSettings),
    Secure(SecureSettings),
}

impl ServiceSettings {
    pub fn connection_string(&self) -> &str {
        match self {
            ServiceSettings::Plain(s) => &s.connection_string,
            ServiceSettings::Secure(s) => &s.connection_string,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            ServiceSettings::Plain(s) => &s.password,
            ServiceSettings::Secure(s) => &s.password,
        }
    }

    /// Cipher name, only present on the secure shape
    pub fn algorithm(&self) -> Option<&str> {
        match self {
            ServiceSettings::Plain(_) => None,
            ServiceSettings::Secure(s) => Some(&s.algorithm),
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ServiceSettings::Secure(_))
    }
}

// Credentials never reach logs through Debug.
impl fmt::Debug for PlainSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainSettings")
            .field("connection_string", &self.connection_string)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for SecureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureSettings")
            .field("connection_string", &self.connection_string)
            .field("password", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
