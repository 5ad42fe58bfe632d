//! Direct registry access through `winreg`.

/// Decodes a little-endian UTF-16 registry string, dropping trailing NULs.
pub fn decode_utf16(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    while units.last() == Some(&0) {
        units.pop();
    }
    String::from_utf16_lossy(&units)
}

/// Encodes `value` as a NUL-terminated little-endian UTF-16 string.
pub fn encode_utf16(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .chain(Some(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

#[cfg(windows)]
pub use self::windows_impl::{NativeInstallIndex, NativeStore};

#[cfg(windows)]
mod windows_impl {
    use std::collections::BTreeMap;
    use std::io::{self, ErrorKind};

    use winreg::enums::{
        RegType, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_SET_VALUE,
    };
    use winreg::{RegKey, RegValue, HKEY};

    use domain::entities::mutation::Scope;
    use domain::entities::tool::ToolDescriptor;
    use domain::ports::discovery::{IndexReport, InstallIndex};
    use domain::ports::environment_store::{EnvironmentStore, StoreError};
    use domain::system::scan::SearchIssue;

    use super::{decode_utf16, encode_utf16};
    use crate::adapters::install_records::{extract_locations, RecordKind, RegistryRecord};

    const MACHINE_SUBKEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
    const USER_SUBKEY: &str = "Environment";

    fn location(scope: Scope) -> (HKEY, &'static str) {
        match scope {
            Scope::Machine => (HKEY_LOCAL_MACHINE, MACHINE_SUBKEY),
            Scope::User => (HKEY_CURRENT_USER, USER_SUBKEY),
        }
    }

    fn map_io(err: io::Error, what: &str) -> StoreError {
        match err.kind() {
            ErrorKind::PermissionDenied => StoreError::AccessDenied(what.to_string()),
            _ => StoreError::Io(err),
        }
    }

    fn is_string(vtype: &RegType) -> bool {
        matches!(vtype, RegType::REG_SZ | RegType::REG_EXPAND_SZ)
    }

    fn open(scope: Scope, flags: u32) -> Result<RegKey, StoreError> {
        let (root, subkey) = location(scope);
        RegKey::predef(root)
            .open_subkey_with_flags(subkey, flags)
            .map_err(|err| map_io(err, subkey))
    }

    /// Reads and writes the environment keys with the registry API.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeStore;

    impl NativeStore {
        pub fn new() -> Self {
            Self
        }
    }

    impl EnvironmentStore for NativeStore {
        fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, StoreError> {
            let key = open(scope, KEY_READ)?;
            match key.get_raw_value(name) {
                Ok(raw) if is_string(&raw.vtype) => Ok(Some(decode_utf16(&raw.bytes))),
                Ok(raw) => Err(StoreError::Malformed {
                    name: name.to_string(),
                    kind: format!("{:?}", raw.vtype),
                }),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(map_io(err, name)),
            }
        }

        fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), StoreError> {
            let key = open(scope, KEY_SET_VALUE)?;
            let raw = RegValue {
                bytes: encode_utf16(value),
                vtype: RegType::REG_EXPAND_SZ,
            };
            key.set_raw_value(name, &raw).map_err(|err| map_io(err, name))
        }

        fn variables(&self, scope: Scope) -> Result<BTreeMap<String, String>, StoreError> {
            let key = open(scope, KEY_READ)?;
            let mut vars = BTreeMap::new();
            for entry in key.enum_values() {
                let (name, raw) = entry.map_err(|err| map_io(err, "enumerate"))?;
                if is_string(&raw.vtype) {
                    vars.insert(name, decode_utf16(&raw.bytes));
                }
            }
            Ok(vars)
        }
    }

    const APP_PATHS: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\App Paths";
    const UNINSTALL: &[&str] = &[
        r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
        r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    ];

    /// Enumerates `App Paths` and `Uninstall` subkeys in process.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeInstallIndex;

    impl NativeInstallIndex {
        pub fn new() -> Self {
            Self
        }

        fn collect(
            &self,
            root: HKEY,
            path: &str,
            kind: RecordKind,
            records: &mut Vec<RegistryRecord>,
            issues: &mut Vec<SearchIssue>,
        ) {
            let parent = match RegKey::predef(root).open_subkey_with_flags(path, KEY_READ) {
                Ok(key) => key,
                Err(err) if err.kind() == ErrorKind::NotFound => return,
                Err(err) => {
                    issues.push(SearchIssue::new(path, err.to_string()));
                    return;
                }
            };

            for name in parent.enum_keys().flatten() {
                let Ok(child) = parent.open_subkey_with_flags(&name, KEY_READ) else {
                    continue;
                };
                let values = child
                    .enum_values()
                    .flatten()
                    .filter(|(_, raw)| is_string(&raw.vtype))
                    .map(|(value_name, raw)| {
                        let value_name = if value_name.is_empty() {
                            "(Default)".to_string()
                        } else {
                            value_name
                        };
                        (value_name, decode_utf16(&raw.bytes))
                    })
                    .collect();
                records.push(RegistryRecord {
                    kind,
                    key: format!(r"{}\{}", path, name),
                    values,
                });
            }
        }
    }

    impl InstallIndex for NativeInstallIndex {
        fn locations(&self, tool: &ToolDescriptor) -> IndexReport {
            let mut records = Vec::new();
            let mut issues = Vec::new();

            for root in [HKEY_LOCAL_MACHINE, HKEY_CURRENT_USER] {
                self.collect(root, APP_PATHS, RecordKind::AppPath, &mut records, &mut issues);
            }
            for path in UNINSTALL {
                self.collect(
                    HKEY_LOCAL_MACHINE,
                    path,
                    RecordKind::Uninstall,
                    &mut records,
                    &mut issues,
                );
            }
            self.collect(
                HKEY_CURRENT_USER,
                UNINSTALL[0],
                RecordKind::Uninstall,
                &mut records,
                &mut issues,
            );

            IndexReport {
                locations: extract_locations(&records, tool),
                issues,
            }
        }
    }
}
