use std::path::PathBuf;

use crate::entities::tool::ToolDescriptor;
use crate::system::scan::SearchIssue;

/// OS search-path lookup (`where` on Windows).
pub trait ExecutableLookup: Send + Sync {
    fn lookup(&self, executable: &str) -> Vec<PathBuf>;
}

/// What an install index reported for one tool.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Executables or install directories; the locator resolves the latter.
    pub locations: Vec<PathBuf>,
    pub issues: Vec<SearchIssue>,
}

/// Installed-software records, such as the `App Paths` and `Uninstall` keys.
pub trait InstallIndex: Send + Sync {
    fn locations(&self, tool: &ToolDescriptor) -> IndexReport;
}

/// Roots of the mounted volumes.
pub trait VolumeSource: Send + Sync {
    fn roots(&self) -> Vec<PathBuf>;
}
