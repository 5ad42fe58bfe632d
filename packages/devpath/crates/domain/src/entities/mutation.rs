use std::fmt;

use serde::{Deserialize, Serialize};

/// Which persistent environment a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// `HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment`
    #[default]
    Machine,
    /// `HKCU\Environment`
    User,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Machine => write!(f, "machine"),
            Scope::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    /// Append to PATH unless an equivalent entry is already there.
    AppendToPath,
}

/// One registry write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentMutation {
    pub scope: Scope,
    pub name: String,
    pub value: String,
    pub mode: WriteMode,
}

impl EnvironmentMutation {
    pub fn set(scope: Scope, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
            value: value.into(),
            mode: WriteMode::Overwrite,
        }
    }

    pub fn append_path(scope: Scope, entry: impl Into<String>) -> Self {
        Self {
            scope,
            name: "Path".to_string(),
            value: entry.into(),
            mode: WriteMode::AppendToPath,
        }
    }
}

impl fmt::Display for EnvironmentMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            WriteMode::Overwrite => write!(f, "{}={} ({})", self.name, self.value, self.scope),
            WriteMode::AppendToPath => write!(f, "PATH += {} ({})", self.value, self.scope),
        }
    }
}
