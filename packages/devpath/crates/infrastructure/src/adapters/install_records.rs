//! Turns `App Paths` and `Uninstall` registry entries into candidate
//! locations. Shared by the native and `reg.exe` install indexes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use domain::entities::tool::{names_match, ToolDescriptor};
use domain::system::expand::expand_from_process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    AppPath,
    Uninstall,
}

/// One registry key with its string values.
#[derive(Debug, Clone)]
pub struct RegistryRecord {
    pub kind: RecordKind,
    pub key: String,
    pub values: BTreeMap<String, String>,
}

impl RegistryRecord {
    fn leaf(&self) -> &str {
        self.key.rsplit('\\').next().unwrap_or(&self.key)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| names_match(key, name))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }
}

fn clean(raw: &str) -> PathBuf {
    PathBuf::from(expand_from_process(raw.trim().trim_matches('"')))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Locations recorded for `tool`, in record order.
///
/// An `App Paths` key named after the executable contributes its default
/// value (the executable itself) and its `Path` value. An `Uninstall` key
/// whose name or `DisplayName` mentions the tool contributes its
/// `InstallLocation`.
pub fn extract_locations(records: &[RegistryRecord], tool: &ToolDescriptor) -> Vec<PathBuf> {
    let mut locations = Vec::new();

    for record in records {
        match record.kind {
            RecordKind::AppPath => {
                if !names_match(record.leaf(), &tool.executable) {
                    continue;
                }
                if let Some(default) = record.value("(Default)").or_else(|| record.value("")) {
                    locations.push(clean(default));
                }
                if let Some(dir) = record.value("Path") {
                    locations.push(clean(dir));
                }
            }
            RecordKind::Uninstall => {
                let named = contains_ignore_case(record.leaf(), &tool.name)
                    || record
                        .value("DisplayName")
                        .is_some_and(|display| contains_ignore_case(display, &tool.name));
                if !named {
                    continue;
                }
                if let Some(location) = record.value("InstallLocation") {
                    locations.push(clean(location));
                }
            }
        }
    }

    locations
}
