use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// `2006-01-02_15-04-05` style stamp shared by both backup files.
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const REGISTRY_PREFIX: &str = "registry_";
const REGISTRY_SUFFIX: &str = ".reg";
const ENV_PREFIX: &str = "env_";
const ENV_SUFFIX: &str = ".json";

/// Identifies one backup. Ordering is chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackupStamp(String);

impl BackupStamp {
    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(STAMP_FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Accepts only well-formed stamps.
    pub fn parse(raw: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(raw, STAMP_FORMAT).ok()?;
        Some(Self(raw.to_string()))
    }

    /// Recovers the stamp from a `registry_<stamp>.reg` file name.
    pub fn from_registry_file_name(file_name: &str) -> Option<Self> {
        let raw = file_name
            .strip_prefix(REGISTRY_PREFIX)?
            .strip_suffix(REGISTRY_SUFFIX)?;
        Self::parse(raw)
    }

    pub fn registry_file_name(&self) -> String {
        format!("{}{}{}", REGISTRY_PREFIX, self.0, REGISTRY_SUFFIX)
    }

    pub fn env_file_name(&self) -> String {
        format!("{}{}{}", ENV_PREFIX, self.0, ENV_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contents of `env_<stamp>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentBackup {
    pub timestamp: DateTime<Local>,
    pub variables: BTreeMap<String, String>,
}
