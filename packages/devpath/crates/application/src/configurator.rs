use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use domain::entities::catalog::Catalog;
use domain::entities::mutation::{EnvironmentMutation, WriteMode};
use domain::entities::profile::{TemplateError, ToolEnvironment};
use domain::entities::tool::ToolDescriptor;
use domain::ports::process_env::ProcessEnvironment;

use crate::registry_writer::{MutationOutcome, RegistryWriter, WriteError};

#[derive(Error, Debug)]
pub enum ConfigureError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Privilege(WriteError),
}

/// A mutation the store rejected. The rest of the batch still ran.
#[derive(Debug)]
pub struct MutationFailure {
    pub mutation: EnvironmentMutation,
    pub error: WriteError,
}

#[derive(Debug)]
pub struct ConfigureReport {
    pub tool: String,
    pub executable: PathBuf,
    pub path_added: Vec<String>,
    pub path_present: Vec<String>,
    pub variables_written: Vec<(String, String)>,
    pub variables_unchanged: Vec<String>,
    pub failures: Vec<MutationFailure>,
}

impl ConfigureReport {
    fn new(tool: &ToolDescriptor, executable: &Path) -> Self {
        Self {
            tool: tool.name.clone(),
            executable: executable.to_path_buf(),
            path_added: Vec::new(),
            path_present: Vec::new(),
            variables_written: Vec::new(),
            variables_unchanged: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when at least one value was persisted.
    pub fn changed(&self) -> bool {
        !self.path_added.is_empty() || !self.variables_written.is_empty()
    }

    fn record(&mut self, mutation: EnvironmentMutation, outcome: MutationOutcome) {
        match (mutation.mode, outcome) {
            (WriteMode::AppendToPath, MutationOutcome::Written) => {
                self.path_added.push(mutation.value)
            }
            (WriteMode::AppendToPath, MutationOutcome::Unchanged) => {
                self.path_present.push(mutation.value)
            }
            (WriteMode::Overwrite, MutationOutcome::Written) => {
                self.variables_written.push((mutation.name, mutation.value))
            }
            (WriteMode::Overwrite, MutationOutcome::Unchanged) => {
                self.variables_unchanged.push(mutation.name)
            }
        }
    }
}

/// Derives a tool's environment from its profile and persists the changes.
pub struct ConfigureService {
    catalog: Arc<Catalog>,
    writer: Arc<RegistryWriter>,
    env: Arc<dyn ProcessEnvironment>,
}

impl ConfigureService {
    pub fn new(
        catalog: Arc<Catalog>,
        writer: Arc<RegistryWriter>,
        env: Arc<dyn ProcessEnvironment>,
    ) -> Self {
        Self {
            catalog,
            writer,
            env,
        }
    }

    /// The environment `configure` would write. Tools without a profile get
    /// only their executable directory.
    pub fn plan(
        &self,
        tool: &ToolDescriptor,
        executable: &Path,
        groups: Option<&[String]>,
    ) -> Result<ToolEnvironment, TemplateError> {
        let executable = executable.to_string_lossy();
        let lookup = |name: &str| self.env.get(name);

        match self.catalog.profile_for(&tool.name) {
            Some(profile) => profile.derive_environment(&executable, &lookup, groups),
            None => Ok(ToolEnvironment::executable_only(&executable)),
        }
    }

    pub fn configure(
        &self,
        tool: &ToolDescriptor,
        executable: &Path,
        groups: Option<&[String]>,
    ) -> Result<ConfigureReport, ConfigureError> {
        let environment = self.plan(tool, executable, groups)?;
        let scope = self.writer.scope();
        let mut report = ConfigureReport::new(tool, executable);

        let mutations = environment
            .path_entries
            .into_iter()
            .map(|entry| EnvironmentMutation::append_path(scope, entry))
            .chain(
                environment
                    .variables
                    .into_iter()
                    .map(|(name, value)| EnvironmentMutation::set(scope, name, value)),
            );

        for mutation in mutations {
            match self.writer.apply(&mutation) {
                Ok(outcome) => report.record(mutation, outcome),
                Err(err @ WriteError::PrivilegeRequired(_)) => {
                    return Err(ConfigureError::Privilege(err))
                }
                Err(error) => {
                    tracing::warn!("{}: failed to apply {}: {}", tool.name, mutation, error);
                    report.failures.push(MutationFailure { mutation, error });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{CountingNotifier, FakeProcessEnv, MemoryStore, Probe};
    use crate::registry_writer::PATH_VAR;
    use domain::entities::mutation::Scope;
    use domain::entities::profile::ToolProfile;

    fn go_catalog() -> Catalog {
        let mut profile = ToolProfile::new("Go");
        profile.root_depth = 2;
        profile.home_var = Some("GOROOT".to_string());
        profile
            .vars
            .insert("GOROOT".to_string(), "{root}".to_string());
        profile
            .vars
            .insert("GOPATH".to_string(), r"{home}\go".to_string());
        profile.path.push(r"{home}\go\bin".to_string());

        Catalog::new(vec![
            ToolDescriptor::new("Go", "go.exe"),
            ToolDescriptor::new("Ninja", "ninja.exe"),
        ])
        .with_profiles(vec![profile])
    }

    fn service(store: Arc<MemoryStore>, probe: Probe) -> ConfigureService {
        let writer = RegistryWriter::new(
            store,
            Arc::new(probe),
            Arc::new(CountingNotifier::default()),
            Scope::Machine,
        );
        ConfigureService::new(
            Arc::new(go_catalog()),
            Arc::new(writer),
            FakeProcessEnv::from_pairs(&[("USERPROFILE", r"C:\Users\dev")]),
        )
    }

    #[test]
    fn writes_path_and_changed_variables_only() {
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, r"C:\Windows"));
        store.insert(Scope::Machine, "GOPATH", r"C:\Users\dev\go");
        let service = service(store.clone(), Probe::elevated());
        let tool = ToolDescriptor::new("Go", "go.exe");

        let report = service
            .configure(&tool, Path::new(r"C:\Go\bin\go.exe"), None)
            .unwrap();

        assert_eq!(report.path_added, vec![r"C:\Go\bin", r"C:\Users\dev\go\bin"]);
        assert_eq!(
            report.variables_written,
            vec![("GOROOT".to_string(), r"C:\Go".to_string())]
        );
        assert_eq!(report.variables_unchanged, vec!["GOPATH".to_string()]);
        assert!(report.failures.is_empty());
        assert!(report.changed());
        assert_eq!(
            store.get(Scope::Machine, PATH_VAR).unwrap(),
            r"C:\Windows;C:\Go\bin;C:\Users\dev\go\bin"
        );
    }

    #[test]
    fn second_run_changes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let service = service(store.clone(), Probe::elevated());
        let tool = ToolDescriptor::new("Go", "go.exe");
        let exe = Path::new(r"C:\Go\bin\go.exe");

        service.configure(&tool, exe, None).unwrap();
        let writes = store.writes();
        let again = service.configure(&tool, exe, None).unwrap();

        assert!(!again.changed());
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn tool_without_profile_gets_its_directory_on_path() {
        let store = Arc::new(MemoryStore::default());
        let service = service(store.clone(), Probe::elevated());
        let tool = ToolDescriptor::new("Ninja", "ninja.exe");

        let report = service
            .configure(&tool, Path::new(r"C:\Tools\ninja.exe"), None)
            .unwrap();

        assert_eq!(report.path_added, vec![r"C:\Tools"]);
        assert!(report.variables_written.is_empty());
    }

    #[test]
    fn store_failures_are_collected_and_the_batch_continues() {
        let store = Arc::new(MemoryStore::default());
        *store.fail_writes_for.lock().unwrap() = Some("GOROOT".to_string());
        let service = service(store.clone(), Probe::elevated());
        let tool = ToolDescriptor::new("Go", "go.exe");

        let report = service
            .configure(&tool, Path::new(r"C:\Go\bin\go.exe"), None)
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].mutation.name, "GOROOT");
        assert_eq!(report.variables_written.len(), 1);
        assert_eq!(report.path_added.len(), 2);
    }

    #[test]
    fn missing_privilege_aborts_the_tool() {
        let store = Arc::new(MemoryStore::default());
        let service = service(store.clone(), Probe::denied());
        let tool = ToolDescriptor::new("Go", "go.exe");

        let err = service
            .configure(&tool, Path::new(r"C:\Go\bin\go.exe"), None)
            .unwrap_err();

        assert!(matches!(err, ConfigureError::Privilege(_)));
        assert_eq!(store.calls(), 0);
    }
}
