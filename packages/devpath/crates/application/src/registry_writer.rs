use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use domain::entities::mutation::{EnvironmentMutation, Scope, WriteMode};
use domain::entities::settings::Settings;
use domain::ports::environment_store::{EnvironmentStore, StoreError};
use domain::ports::system::{ChangeNotifier, PrivilegeProbe};
use domain::system::path_list::{append_entry, contains_entry, remove_entries, PATH_SEPARATOR};
use infrastructure::PlatformAdapters;

pub const PATH_VAR: &str = "Path";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Administrator privileges are required to modify the {0} environment")]
    PrivilegeRequired(Scope),
    #[error("'{0}' is not a single PATH entry")]
    InvalidEntry(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathUpdate {
    Appended,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Written,
    Unchanged,
}

/// The only component that mutates the persistent environment.
pub struct RegistryWriter {
    store: Arc<dyn EnvironmentStore>,
    probe: Arc<dyn PrivilegeProbe>,
    notifier: Arc<dyn ChangeNotifier>,
    scope: Scope,
    broadcast_timeout: Duration,
}

impl RegistryWriter {
    pub fn new(
        store: Arc<dyn EnvironmentStore>,
        probe: Arc<dyn PrivilegeProbe>,
        notifier: Arc<dyn ChangeNotifier>,
        scope: Scope,
    ) -> Self {
        Self {
            store,
            probe,
            notifier,
            scope,
            broadcast_timeout: Duration::from_millis(5000),
        }
    }

    pub fn from_adapters(adapters: &PlatformAdapters, settings: &Settings) -> Self {
        Self::new(
            adapters.store.clone(),
            adapters.probe.clone(),
            adapters.notifier.clone(),
            settings.scope,
        )
        .with_broadcast_timeout(Duration::from_millis(settings.notify.broadcast_timeout_ms))
    }

    pub fn with_broadcast_timeout(mut self, timeout: Duration) -> Self {
        self.broadcast_timeout = timeout;
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Appends `entry` to PATH unless an equivalent entry is already there.
    pub fn add_to_path(&self, entry: &str) -> Result<PathUpdate, WriteError> {
        self.append_in(self.scope, entry)
    }

    pub fn set_variable(&self, name: &str, value: &str) -> Result<(), WriteError> {
        self.ensure_elevated(self.scope)?;
        self.store.write(self.scope, name, value)?;
        tracing::info!("Set {}={} ({})", name, value, self.scope);
        self.broadcast();
        Ok(())
    }

    /// Applies one mutation. Overwrites are skipped when the persisted value
    /// already equals the new one.
    pub fn apply(&self, mutation: &EnvironmentMutation) -> Result<MutationOutcome, WriteError> {
        match mutation.mode {
            WriteMode::AppendToPath => Ok(match self.append_in(mutation.scope, &mutation.value)? {
                PathUpdate::Appended => MutationOutcome::Written,
                PathUpdate::AlreadyPresent => MutationOutcome::Unchanged,
            }),
            WriteMode::Overwrite => {
                self.ensure_elevated(mutation.scope)?;
                let current = self.store.read(mutation.scope, &mutation.name)?;
                if current.as_deref() == Some(mutation.value.as_str()) {
                    tracing::debug!("{} unchanged", mutation.name);
                    return Ok(MutationOutcome::Unchanged);
                }
                self.store
                    .write(mutation.scope, &mutation.name, &mutation.value)?;
                tracing::info!("Applied {}", mutation);
                self.broadcast();
                Ok(MutationOutcome::Written)
            }
        }
    }

    /// Drops `entries` from PATH, also collapsing repeated entries when
    /// `collapse_duplicates` is set. Returns how many entries went away.
    pub fn remove_from_path(
        &self,
        entries: &[String],
        collapse_duplicates: bool,
    ) -> Result<usize, WriteError> {
        self.ensure_elevated(self.scope)?;
        let current = self.read_path(self.scope)?;
        let (updated, removed) = remove_entries(&current, entries, collapse_duplicates);
        if removed == 0 {
            return Ok(0);
        }

        self.store.write(self.scope, PATH_VAR, &updated)?;
        tracing::info!("Removed {} PATH entries ({})", removed, self.scope);
        self.broadcast();
        Ok(removed)
    }

    /// Fails unless the process may write to this writer's scope.
    pub fn ensure_writable(&self) -> Result<(), WriteError> {
        self.ensure_elevated(self.scope)
    }

    /// The PATH value persisted in this writer's scope.
    pub fn persisted_path(&self) -> Result<String, WriteError> {
        self.read_path(self.scope)
    }

    fn append_in(&self, scope: Scope, entry: &str) -> Result<PathUpdate, WriteError> {
        self.ensure_elevated(scope)?;
        if entry.trim().is_empty() || entry.contains(PATH_SEPARATOR) {
            return Err(WriteError::InvalidEntry(entry.to_string()));
        }
        let current = self.read_path(scope)?;
        if contains_entry(&current, entry) {
            tracing::debug!("{} already on PATH ({})", entry, scope);
            return Ok(PathUpdate::AlreadyPresent);
        }

        self.store
            .write(scope, PATH_VAR, &append_entry(&current, entry))?;
        tracing::info!("Added {} to PATH ({})", entry, scope);
        self.broadcast();
        Ok(PathUpdate::Appended)
    }

    fn read_path(&self, scope: Scope) -> Result<String, WriteError> {
        Ok(self.store.read(scope, PATH_VAR)?.unwrap_or_default())
    }

    fn ensure_elevated(&self, scope: Scope) -> Result<(), WriteError> {
        if self.probe.is_elevated() {
            Ok(())
        } else {
            Err(WriteError::PrivilegeRequired(scope))
        }
    }

    fn broadcast(&self) {
        if let Err(err) = self.notifier.broadcast(self.broadcast_timeout) {
            tracing::warn!("Environment change broadcast failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{CountingNotifier, MemoryStore, Probe};
    use std::sync::atomic::Ordering;

    fn writer(store: Arc<MemoryStore>, probe: Probe) -> (RegistryWriter, Arc<CountingNotifier>) {
        let notifier = Arc::new(CountingNotifier::default());
        let writer = RegistryWriter::new(store, Arc::new(probe), notifier.clone(), Scope::Machine);
        (writer, notifier)
    }

    #[test]
    fn equivalent_path_is_not_written_again() {
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, r"C:\A;C:\B\"));
        let (writer, notifier) = writer(store.clone(), Probe::elevated());

        let update = writer.add_to_path(r"C:\b").unwrap();

        assert_eq!(update, PathUpdate::AlreadyPresent);
        assert_eq!(store.writes(), 0);
        assert_eq!(notifier.broadcasts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn add_to_path_is_idempotent_across_spellings() {
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, r"C:\Windows;"));
        let (writer, notifier) = writer(store.clone(), Probe::elevated());

        assert_eq!(writer.add_to_path(r"C:\Go\bin").unwrap(), PathUpdate::Appended);
        assert_eq!(
            writer.add_to_path("c:/go/BIN/").unwrap(),
            PathUpdate::AlreadyPresent
        );

        assert_eq!(
            store.get(Scope::Machine, PATH_VAR).unwrap(),
            r"C:\Windows;C:\Go\bin"
        );
        assert_eq!(notifier.broadcasts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_path_is_treated_as_empty() {
        let store = Arc::new(MemoryStore::default());
        let (writer, _) = writer(store.clone(), Probe::elevated());

        writer.add_to_path(r"C:\Tools").unwrap();
        assert_eq!(store.get(Scope::Machine, PATH_VAR).unwrap(), r"C:\Tools");
    }

    #[test]
    fn denied_privilege_never_touches_the_store() {
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, r"C:\A"));
        let (writer, notifier) = writer(store.clone(), Probe::denied());

        assert!(matches!(
            writer.add_to_path(r"C:\B"),
            Err(WriteError::PrivilegeRequired(Scope::Machine))
        ));
        assert!(matches!(
            writer.set_variable("GOROOT", r"C:\Go"),
            Err(WriteError::PrivilegeRequired(_))
        ));
        assert!(writer
            .apply(&EnvironmentMutation::set(Scope::User, "X", "1"))
            .is_err());

        assert_eq!(store.calls(), 0);
        assert_eq!(notifier.broadcasts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn broadcast_failure_does_not_fail_the_write() {
        let store = Arc::new(MemoryStore::default());
        let (writer, notifier) = writer(store.clone(), Probe::elevated());
        notifier.fail.store(true, Ordering::SeqCst);

        writer.set_variable("JAVA_HOME", r"C:\Java\jdk-21").unwrap();
        assert_eq!(
            store.get(Scope::Machine, "JAVA_HOME").as_deref(),
            Some(r"C:\Java\jdk-21")
        );
    }

    #[test]
    fn apply_skips_unchanged_values() {
        let store = Arc::new(MemoryStore::with(Scope::User, "GOPATH", r"C:\Users\dev\go"));
        let (writer, _) = writer(store.clone(), Probe::elevated());

        let same = EnvironmentMutation::set(Scope::User, "GOPATH", r"C:\Users\dev\go");
        assert_eq!(writer.apply(&same).unwrap(), MutationOutcome::Unchanged);

        let changed = EnvironmentMutation::set(Scope::User, "GOPATH", r"D:\go");
        assert_eq!(writer.apply(&changed).unwrap(), MutationOutcome::Written);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn remove_from_path_collapses_duplicates() {
        let store = Arc::new(MemoryStore::with(
            Scope::Machine,
            PATH_VAR,
            r"C:\A;C:\Gone;c:\a\;C:\B",
        ));
        let (writer, _) = writer(store.clone(), Probe::elevated());

        let removed = writer
            .remove_from_path(&[r"C:\Gone".to_string()], true)
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.get(Scope::Machine, PATH_VAR).unwrap(), r"C:\A;C:\B");
    }

    #[test]
    fn blank_or_compound_entries_are_rejected_before_reading() {
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, r"C:\A"));
        let (writer, notifier) = writer(store.clone(), Probe::elevated());

        for entry in ["", "   ", r"C:\B;C:\C", ";"] {
            assert!(matches!(
                writer.add_to_path(entry),
                Err(WriteError::InvalidEntry(_))
            ));
        }
        assert!(matches!(
            writer.apply(&EnvironmentMutation::append_path(Scope::User, r"C:\X;")),
            Err(WriteError::InvalidEntry(_))
        ));

        assert_eq!(store.calls(), 0);
        assert_eq!(store.get(Scope::Machine, PATH_VAR).unwrap(), r"C:\A");
        assert_eq!(notifier.broadcasts.load(Ordering::SeqCst), 0);
    }
}
