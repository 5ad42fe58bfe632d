//! Registry access by shelling out to `reg.exe`.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use domain::entities::mutation::Scope;
use domain::entities::tool::ToolDescriptor;
use domain::ports::discovery::{IndexReport, InstallIndex};
use domain::ports::environment_store::{EnvironmentStore, RegistrySnapshot, StoreError};
use domain::system::scan::SearchIssue;

use crate::adapters::install_records::{extract_locations, RecordKind, RegistryRecord};
use crate::system::command::{self, CommandError, CommandOutput};

pub const MACHINE_ENV_KEY: &str =
    r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
pub const USER_ENV_KEY: &str = r"HKCU\Environment";

const STRING_KINDS: &[&str] = &["REG_SZ", "REG_EXPAND_SZ"];

pub fn env_key(scope: Scope) -> &'static str {
    match scope {
        Scope::Machine => MACHINE_ENV_KEY,
        Scope::User => USER_ENV_KEY,
    }
}

/// One value line of `reg query` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegValueLine {
    pub name: String,
    pub kind: String,
    pub data: String,
}

/// A key header and the values listed under it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegQuerySection {
    pub key: String,
    pub values: Vec<RegValueLine>,
}

/// Parses a single indented value line such as
/// `    Path    REG_EXPAND_SZ    C:\Windows;C:\Tools`.
pub fn parse_value_line(line: &str) -> Option<RegValueLine> {
    if !line.starts_with(' ') && !line.starts_with('\t') {
        return None;
    }
    let trimmed = line.trim_start();
    let type_at = trimmed.find("    REG_")?;
    let name = trimmed[..type_at].trim_end().to_string();

    let after_name = &trimmed[type_at + 4..];
    let (kind, data) = match after_name.find("    ") {
        Some(idx) => (&after_name[..idx], &after_name[idx + 4..]),
        None => (after_name.trim_end(), ""),
    };

    Some(RegValueLine {
        name,
        kind: kind.to_string(),
        data: data.trim_end_matches(['\r', '\n']).to_string(),
    })
}

/// Splits `reg query [/s]` output into key sections.
pub fn parse_query_output(output: &str) -> Vec<RegQuerySection> {
    let mut sections: Vec<RegQuerySection> = Vec::new();

    for line in output.lines() {
        if line.starts_with("HKEY_") {
            sections.push(RegQuerySection {
                key: line.trim_end().to_string(),
                values: Vec::new(),
            });
            continue;
        }
        if let (Some(value), Some(section)) = (parse_value_line(line), sections.last_mut()) {
            section.values.push(value);
        }
    }

    sections
}

fn store_error(err: CommandError) -> StoreError {
    match err {
        CommandError::Missing(_) => StoreError::Unsupported,
        other => StoreError::Command {
            command: "reg".to_string(),
            detail: other.to_string(),
        },
    }
}

fn failure(args: &[&str], output: &CommandOutput) -> StoreError {
    let detail = output.stderr.trim().to_string();
    if detail.to_lowercase().contains("access is denied") {
        return StoreError::AccessDenied(args.get(1).copied().unwrap_or_default().to_string());
    }
    StoreError::Command {
        command: format!("reg {}", args.join(" ")),
        detail,
    }
}

fn reg(args: &[&str]) -> Result<CommandOutput, StoreError> {
    command::run("reg", args).map_err(store_error)
}

fn is_not_found(output: &CommandOutput) -> bool {
    output.stderr.to_lowercase().contains("unable to find")
}

/// [`EnvironmentStore`] backed by `reg query` and `reg add`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegExeStore;

impl RegExeStore {
    pub fn new() -> Self {
        Self
    }
}

impl EnvironmentStore for RegExeStore {
    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, StoreError> {
        let args = ["query", env_key(scope), "/v", name];
        let output = reg(&args)?;
        if !output.success() {
            if is_not_found(&output) {
                return Ok(None);
            }
            return Err(failure(&args, &output));
        }

        let value = parse_query_output(&output.stdout)
            .into_iter()
            .flat_map(|section| section.values)
            .find(|value| value.name.eq_ignore_ascii_case(name));

        match value {
            None => Ok(None),
            Some(value) if STRING_KINDS.contains(&value.kind.as_str()) => Ok(Some(value.data)),
            Some(value) => Err(StoreError::Malformed {
                name: name.to_string(),
                kind: value.kind,
            }),
        }
    }

    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), StoreError> {
        let args = [
            "add",
            env_key(scope),
            "/v",
            name,
            "/t",
            "REG_EXPAND_SZ",
            "/d",
            value,
            "/f",
        ];
        let output = reg(&args)?;
        if !output.success() {
            return Err(failure(&args, &output));
        }
        Ok(())
    }

    fn variables(&self, scope: Scope) -> Result<BTreeMap<String, String>, StoreError> {
        let args = ["query", env_key(scope)];
        let output = reg(&args)?;
        if !output.success() {
            return Err(failure(&args, &output));
        }

        Ok(parse_query_output(&output.stdout)
            .into_iter()
            .flat_map(|section| section.values)
            .filter(|value| STRING_KINDS.contains(&value.kind.as_str()))
            .map(|value| (value.name, value.data))
            .collect())
    }
}

/// `reg export` / `reg import` of the environment key.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegExeSnapshot;

impl RegExeSnapshot {
    pub fn new() -> Self {
        Self
    }
}

impl RegistrySnapshot for RegExeSnapshot {
    fn export(&self, scope: Scope, destination: &Path) -> Result<(), StoreError> {
        let file = destination.to_string_lossy();
        let args = ["export", env_key(scope), file.as_ref(), "/y"];
        let output = reg(&args)?;
        if !output.success() {
            return Err(failure(&args, &output));
        }
        Ok(())
    }

    fn import(&self, source: &Path) -> Result<(), StoreError> {
        let file = source.to_string_lossy();
        let args = ["import", file.as_ref()];
        let output = reg(&args)?;
        if !output.success() {
            return Err(failure(&args, &output));
        }
        Ok(())
    }
}

pub const APP_PATHS_KEYS: &[&str] = &[
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths",
    r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths",
];

pub const UNINSTALL_KEYS: &[&str] = &[
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
];

/// Walks `App Paths` and `Uninstall` with `reg query /s`, one bounded
/// child process per key.
#[derive(Debug, Clone, Copy)]
pub struct RegExeInstallIndex {
    timeout: Duration,
}

impl RegExeInstallIndex {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn query(&self, key: &str, kind: RecordKind, report: &mut IndexReport, tool: &ToolDescriptor) {
        let output = match command::run_with_timeout("reg", &["query", key, "/s"], Some(self.timeout))
        {
            Ok(output) => output,
            Err(CommandError::Missing(_)) => {
                tracing::debug!("reg.exe unavailable, skipping install index");
                return;
            }
            Err(err) => {
                tracing::warn!("Install index query on {} failed: {}", key, err);
                report.issues.push(SearchIssue::new(key, err.to_string()));
                return;
            }
        };

        // A missing key just means nothing was ever registered there.
        if !output.success() {
            tracing::debug!("reg query {} exited with {}", key, output.status);
            return;
        }

        let records: Vec<RegistryRecord> = parse_query_output(&output.stdout)
            .into_iter()
            .map(|section| RegistryRecord {
                kind,
                key: section.key,
                values: section
                    .values
                    .into_iter()
                    .map(|value| (value.name, value.data))
                    .collect(),
            })
            .collect();

        report.locations.extend(extract_locations(&records, tool));
    }
}

impl InstallIndex for RegExeInstallIndex {
    fn locations(&self, tool: &ToolDescriptor) -> IndexReport {
        let mut report = IndexReport::default();
        for key in APP_PATHS_KEYS {
            self.query(key, RecordKind::AppPath, &mut report, tool);
        }
        for key in UNINSTALL_KEYS {
            self.query(key, RecordKind::Uninstall, &mut report, tool);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = concat!(
        "\r\n",
        "HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Control\\Session Manager\\Environment\r\n",
        "    ComSpec    REG_EXPAND_SZ    %SystemRoot%\\system32\\cmd.exe\r\n",
        "    NUMBER_OF_PROCESSORS    REG_SZ    8\r\n",
        "    Path    REG_EXPAND_SZ    C:\\Windows;C:\\Program Files\\Go\\bin\r\n",
        "    DriverData    REG_SZ    \r\n",
        "    OS Flags    REG_DWORD    0x1\r\n",
        "\r\n",
    );

    #[test]
    fn parses_value_lines_with_spaces() {
        let sections = parse_query_output(QUERY);
        assert_eq!(sections.len(), 1);

        let values = &sections[0].values;
        assert_eq!(values.len(), 5);
        assert_eq!(values[2].name, "Path");
        assert_eq!(values[2].kind, "REG_EXPAND_SZ");
        assert_eq!(values[2].data, r"C:\Windows;C:\Program Files\Go\bin");
        assert_eq!(values[3].data, "");
        assert_eq!(values[4].name, "OS Flags");
        assert_eq!(values[4].kind, "REG_DWORD");
    }

    #[test]
    fn header_lines_start_new_sections() {
        let output = "HKEY_LOCAL_MACHINE\\SOFTWARE\\A\n    (Default)    REG_SZ    C:\\a.exe\n\nHKEY_LOCAL_MACHINE\\SOFTWARE\\B\n    Path    REG_SZ    C:\\b\n";
        let sections = parse_query_output(output);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].values[0].name, "(Default)");
        assert_eq!(sections[1].key, r"HKEY_LOCAL_MACHINE\SOFTWARE\B");
    }

    #[test]
    fn non_value_lines_are_ignored() {
        assert!(parse_value_line("HKEY_CURRENT_USER\\Environment").is_none());
        assert!(parse_value_line("End of search: 3 match(es) found.").is_none());
        assert!(parse_value_line("    no type marker here").is_none());
    }

    #[test]
    fn scope_selects_the_environment_key() {
        assert!(env_key(Scope::Machine).starts_with("HKLM"));
        assert_eq!(env_key(Scope::User), r"HKCU\Environment");
    }
}
