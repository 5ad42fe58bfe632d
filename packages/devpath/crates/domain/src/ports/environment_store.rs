use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::entities::mutation::Scope;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Variable '{name}' holds a {kind} value, expected a string")]
    Malformed { name: String, kind: String },
    #[error("`{command}` failed: {detail}")]
    Command { command: String, detail: String },
    #[error("Registry access is not available on this platform")]
    Unsupported,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The persistent environment key of one scope.
pub trait EnvironmentStore: Send + Sync {
    /// `Ok(None)` when the value does not exist.
    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` as an expandable string.
    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), StoreError>;

    /// Every string value under the key.
    fn variables(&self, scope: Scope) -> Result<BTreeMap<String, String>, StoreError>;
}

/// Whole-key export and import in `reg export` format.
pub trait RegistrySnapshot: Send + Sync {
    fn export(&self, scope: Scope, destination: &Path) -> Result<(), StoreError>;
    fn import(&self, source: &Path) -> Result<(), StoreError>;
}
