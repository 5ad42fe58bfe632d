//! In-memory port implementations with call counters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use domain::entities::mutation::Scope;
use domain::entities::tool::ToolDescriptor;
use domain::ports::discovery::{ExecutableLookup, IndexReport, InstallIndex, VolumeSource};
use domain::ports::environment_store::{EnvironmentStore, RegistrySnapshot, StoreError};
use domain::ports::process_env::ProcessEnvironment;
use domain::ports::system::{ChangeNotifier, NotifyError, PrivilegeProbe};

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<(Scope, String), String>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_writes_for: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn with(scope: Scope, name: &str, value: &str) -> Self {
        let store = Self::default();
        store.insert(scope, name, value);
        store
    }

    pub fn insert(&self, scope: Scope, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((scope, name.to_string()), value.to_string());
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap()
            .get(&(scope, name.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl EnvironmentStore for MemoryStore {
    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(scope, name))
    }

    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes_for.lock().unwrap().as_deref() == Some(name) {
            return Err(StoreError::AccessDenied(name.to_string()));
        }
        self.insert(scope, name, value);
        Ok(())
    }

    fn variables(&self, scope: Scope) -> Result<BTreeMap<String, String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .values
            .lock()
            .unwrap()
            .iter()
            .filter(|((s, _), _)| *s == scope)
            .map(|((_, name), value)| (name.clone(), value.clone()))
            .collect())
    }
}

pub struct Probe(pub AtomicBool);

impl Probe {
    pub fn elevated() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn denied() -> Self {
        Self(AtomicBool::new(false))
    }
}

impl PrivilegeProbe for Probe {
    fn is_elevated(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    pub broadcasts: AtomicUsize,
    pub fail: AtomicBool,
}

impl ChangeNotifier for CountingNotifier {
    fn broadcast(&self, timeout: Duration) -> Result<(), NotifyError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::TimedOut(timeout));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticLookup {
    pub found: Vec<PathBuf>,
    pub calls: AtomicUsize,
}

impl ExecutableLookup for StaticLookup {
    fn lookup(&self, _executable: &str) -> Vec<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.found.clone()
    }
}

#[derive(Default)]
pub struct StaticIndex {
    pub locations: Vec<PathBuf>,
}

impl InstallIndex for StaticIndex {
    fn locations(&self, _tool: &ToolDescriptor) -> IndexReport {
        IndexReport {
            locations: self.locations.clone(),
            issues: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct CountingVolumes {
    pub roots: Vec<PathBuf>,
    pub calls: AtomicUsize,
}

impl VolumeSource for CountingVolumes {
    fn roots(&self) -> Vec<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.roots.clone()
    }
}

#[derive(Default)]
pub struct FakeProcessEnv(pub Mutex<BTreeMap<String, String>>);

impl FakeProcessEnv {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }
}

impl ProcessEnvironment for FakeProcessEnv {
    fn vars(&self) -> BTreeMap<String, String> {
        self.0.lock().unwrap().clone()
    }

    fn set(&self, name: &str, value: &str) {
        self.0
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }
}

/// Writes a marker file on export and records imports.
#[derive(Default)]
pub struct FileSnapshot {
    pub imported: Mutex<Vec<PathBuf>>,
}

impl RegistrySnapshot for FileSnapshot {
    fn export(&self, scope: Scope, destination: &Path) -> Result<(), StoreError> {
        std::fs::write(destination, format!("Windows Registry Editor Version 5.00\r\n; {scope}\r\n"))?;
        Ok(())
    }

    fn import(&self, source: &Path) -> Result<(), StoreError> {
        self.imported.lock().unwrap().push(source.to_path_buf());
        Ok(())
    }
}
