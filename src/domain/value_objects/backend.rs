//! Queue backend selector

use std::fmt;

/// Queue backend implementations a process can run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Redis,
    MongoDB,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Redis, BackendKind::MongoDB];

    /// Match a configured selector value. Matching is exact, `redis` is not `Redis`.
    pub fn from_config_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Redis => "Redis",
            BackendKind::MongoDB => "MongoDB",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
