use std::collections::BTreeMap;

use domain::ports::process_env::ProcessEnvironment;

/// The real environment of this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProcessEnvironment;

impl OsProcessEnvironment {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessEnvironment for OsProcessEnvironment {
    fn vars(&self) -> BTreeMap<String, String> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set(&self, name: &str, value: &str) {
        if name.is_empty() || name.contains(['=', '\0']) || value.contains('\0') {
            tracing::warn!("Refusing to set invalid process variable {:?}", name);
            return;
        }
        std::env::set_var(name, value);
    }
}
