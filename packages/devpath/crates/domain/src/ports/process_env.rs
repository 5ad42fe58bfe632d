use std::collections::BTreeMap;

/// The environment of the running process.
pub trait ProcessEnvironment: Send + Sync {
    fn vars(&self) -> BTreeMap<String, String>;

    fn get(&self, name: &str) -> Option<String> {
        self.vars().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str);
}
