use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::entities::mutation::Scope;
use crate::system::scan::DEFAULT_SKIP_DIRS;

/// Which registry implementation backs reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryBackend {
    /// Direct registry API calls.
    #[default]
    Native,
    /// Shell out to `reg.exe`.
    RegExe,
}

/// Contents of `config.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scope: Scope,
    pub registry_backend: RegistryBackend,
    pub backup_dir: Option<PathBuf>,
    pub catalog_file: Option<PathBuf>,
    pub search: SearchSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub max_parallel_walks: usize,
    pub full_volume_fallback: bool,
    pub registry_query_timeout_secs: u64,
    pub extra_skip_dirs: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_parallel_walks: 8,
            full_volume_fallback: true,
            registry_query_timeout_secs: 5,
            extra_skip_dirs: Vec::new(),
        }
    }
}

impl SearchSettings {
    /// Built-in skip list plus configured additions.
    pub fn skip_dirs(&self) -> Vec<String> {
        DEFAULT_SKIP_DIRS
            .iter()
            .map(|s| s.to_string())
            .chain(self.extra_skip_dirs.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub broadcast_timeout_ms: u64,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            broadcast_timeout_ms: 5000,
        }
    }
}
