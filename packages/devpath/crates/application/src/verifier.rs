//! Read-only health check of PATH and the tool environment, plus a fix pass
//! that goes through the registry writer.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use domain::entities::catalog::Catalog;
use domain::entities::issue::{ConfigurationIssue, IssueKind, Severity};
use domain::ports::process_env::ProcessEnvironment;
use domain::system::expand::expand_env_refs;
use domain::system::path_list::{normalize_path, remove_entries, split_entries};
use domain::system::scan::expand_candidate;

use crate::registry_writer::{RegistryWriter, WriteError};

/// Longest PATH entry legacy Windows APIs accept.
pub const MAX_PATH_ENTRY_LEN: usize = 260;

struct HomeVar {
    name: &'static str,
    description: &'static str,
    required: bool,
    /// Where the fix pass looks when the variable is missing.
    candidates: &'static [&'static str],
}

const HOME_VARS: &[HomeVar] = &[
    HomeVar {
        name: "JAVA_HOME",
        description: "Java Development Kit",
        required: true,
        candidates: &[
            r"C:\Program Files\Java\*",
            r"C:\Program Files (x86)\Java\*",
            r"C:\Program Files\Eclipse Foundation\*",
        ],
    },
    HomeVar {
        name: "PYTHON_HOME",
        description: "Python",
        required: true,
        candidates: &[
            r"C:\Python3*",
            r"C:\Program Files\Python*",
            r"C:\Program Files (x86)\Python*",
            r"%LOCALAPPDATA%\Programs\Python\Python*",
        ],
    },
    HomeVar {
        name: "GOROOT",
        description: "Go Programming Language",
        required: true,
        candidates: &[r"C:\Go", r"C:\Program Files\Go"],
    },
    HomeVar {
        name: "GOPATH",
        description: "Go Workspace",
        required: true,
        candidates: &[r"%USERPROFILE%\go"],
    },
    HomeVar {
        name: "NODE_PATH",
        description: "Node.js modules",
        required: false,
        candidates: &[r"C:\Program Files\nodejs", r"C:\Program Files (x86)\nodejs"],
    },
    HomeVar {
        name: "MAVEN_HOME",
        description: "Apache Maven",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "GRADLE_HOME",
        description: "Gradle",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "DOCKER_HOME",
        description: "Docker",
        required: false,
        candidates: &[r"C:\Program Files\Docker\Docker", r"C:\Program Files\Docker"],
    },
    HomeVar {
        name: "KUBECONFIG",
        description: "Kubernetes",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "RUST_HOME",
        description: "Rust",
        required: false,
        candidates: &[r"%USERPROFILE%\.cargo", r"C:\Program Files\Rust"],
    },
    HomeVar {
        name: "CARGO_HOME",
        description: "Cargo (Rust package manager)",
        required: false,
        candidates: &[r"%USERPROFILE%\.cargo"],
    },
    HomeVar {
        name: "POSTGRES_HOME",
        description: "PostgreSQL",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "MYSQL_HOME",
        description: "MySQL",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "MONGODB_HOME",
        description: "MongoDB",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "REDIS_HOME",
        description: "Redis",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "ES_HOME",
        description: "Elasticsearch",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "NEO4J_HOME",
        description: "Neo4j",
        required: false,
        candidates: &[],
    },
    HomeVar {
        name: "INFLUXDB_HOME",
        description: "InfluxDB",
        required: false,
        candidates: &[],
    },
];

/// Database credentials that should live in config files, not the environment.
const CREDENTIAL_VARS: &[(&str, &[&str])] = &[
    ("PostgreSQL", &["PGPASSWORD", "PGUSER"]),
    ("MySQL", &["MYSQL_ROOT_PASSWORD", "MYSQL_USER"]),
    (
        "MongoDB",
        &["MONGO_INITDB_ROOT_PASSWORD", "MONGO_INITDB_ROOT_USERNAME"],
    ),
];

const DUPLICATE_PATH: &str = "Duplicate PATH entry found";
const MISSING_PATH: &str = "PATH entry does not exist";
const MISSING_HOME_PREFIX: &str = "Missing required";

/// Outcome of [`Verifier::fix`].
#[derive(Debug, Default)]
pub struct FixReport {
    pub fixed: Vec<String>,
    /// Issues the operator has to resolve by hand.
    pub manual: Vec<ConfigurationIssue>,
    pub failed: Vec<(ConfigurationIssue, String)>,
}

pub struct Verifier {
    catalog: Arc<Catalog>,
    env: Arc<dyn ProcessEnvironment>,
    writer: Arc<RegistryWriter>,
}

impl Verifier {
    pub fn new(
        catalog: Arc<Catalog>,
        env: Arc<dyn ProcessEnvironment>,
        writer: Arc<RegistryWriter>,
    ) -> Self {
        Self {
            catalog,
            env,
            writer,
        }
    }

    pub fn verify(&self) -> Vec<ConfigurationIssue> {
        let mut issues = self.check_path();
        issues.extend(self.check_homes());
        issues.extend(self.check_programs());
        issues.extend(self.check_credentials());
        issues.extend(self.check_permissions());
        tracing::debug!("Verification found {} issue(s)", issues.len());
        issues
    }

    fn var(&self, name: &str) -> Option<String> {
        self.env.get(name).filter(|value| !value.is_empty())
    }

    fn path_value(&self) -> String {
        self.var("Path").or_else(|| self.var("PATH")).unwrap_or_default()
    }

    fn check_path(&self) -> Vec<ConfigurationIssue> {
        let raw = self.path_value();
        let mut seen = HashSet::new();
        let mut issues = Vec::new();

        for entry in split_entries(&raw) {
            if !seen.insert(normalize_path(entry)) {
                issues.push(ConfigurationIssue::new(
                    IssueKind::Path,
                    Severity::Low,
                    DUPLICATE_PATH,
                    entry,
                    "Remove duplicate entry from PATH",
                ));
            }
            if !Path::new(entry).exists() {
                issues.push(ConfigurationIssue::new(
                    IssueKind::Path,
                    Severity::Medium,
                    MISSING_PATH,
                    entry,
                    "Remove non-existent path or create directory",
                ));
            }
            if entry.chars().count() > MAX_PATH_ENTRY_LEN {
                issues.push(ConfigurationIssue::new(
                    IssueKind::Path,
                    Severity::High,
                    "PATH entry exceeds Windows path length limit",
                    entry,
                    "Shorten path or use subst to create drive letter mapping",
                ));
            }
        }
        issues
    }

    fn check_homes(&self) -> Vec<ConfigurationIssue> {
        let mut issues = Vec::new();
        for home in HOME_VARS {
            match self.var(home.name) {
                None if home.required => issues.push(ConfigurationIssue::new(
                    IssueKind::Env,
                    Severity::High,
                    format!("{} {} environment variable", MISSING_HOME_PREFIX, home.description),
                    home.name,
                    format!("Set {} to the installation directory", home.name),
                )),
                None => {}
                Some(value) if !Path::new(&value).exists() => {
                    issues.push(ConfigurationIssue::new(
                        IssueKind::Env,
                        Severity::Medium,
                        format!("{} path does not exist", home.description),
                        format!("{}={}", home.name, value),
                        "Update path to correct installation directory",
                    ))
                }
                Some(_) => {}
            }
        }
        issues
    }

    /// Catalog tools whose executable sits directly in none of their
    /// candidate directories.
    fn check_programs(&self) -> Vec<ConfigurationIssue> {
        self.catalog
            .tools()
            .iter()
            .filter(|tool| !tool.candidate_paths.is_empty())
            .filter(|tool| {
                !tool.candidate_paths.iter().any(|pattern| {
                    expand_candidate(pattern, |name| self.env.get(name))
                        .iter()
                        .any(|dir| dir.join(&tool.executable).is_file())
                })
            })
            .map(|tool| {
                ConfigurationIssue::new(
                    IssueKind::Program,
                    Severity::Medium,
                    format!("{} not found in common installation paths", tool.name),
                    &tool.executable,
                    format!("Install {} or update PATH if already installed", tool.name),
                )
            })
            .collect()
    }

    fn check_credentials(&self) -> Vec<ConfigurationIssue> {
        CREDENTIAL_VARS
            .iter()
            .flat_map(|(database, names)| names.iter().map(move |name| (*database, *name)))
            .filter(|(_, name)| self.var(name).is_some())
            .map(|(database, name)| {
                ConfigurationIssue::new(
                    IssueKind::Security,
                    Severity::High,
                    format!("{}: credentials in environment", database),
                    name,
                    "Use configuration files instead of environment variables for credentials",
                )
            })
            .collect()
    }

    fn check_permissions(&self) -> Vec<ConfigurationIssue> {
        let kube = self
            .var("USERPROFILE")
            .map(|home| format!(r"{}\.kube", home.trim_end_matches(['\\', '/'])));
        let dirs = [
            (self.var("GOPATH"), "Go workspace", true),
            (self.var("MAVEN_REPOSITORY"), "Maven repository", false),
            (self.var("GRADLE_USER_HOME"), "Gradle home", false),
            (self.var("DOCKER_CONFIG"), "Docker configuration", true),
            (kube, "Kubernetes configuration", false),
        ];

        let mut issues = Vec::new();
        for (path, description, required) in dirs {
            let Some(path) = path else {
                if required {
                    issues.push(ConfigurationIssue::new(
                        IssueKind::Permission,
                        Severity::High,
                        format!("Required directory path not set: {}", description),
                        "",
                        "Set correct path and ensure proper permissions",
                    ));
                }
                continue;
            };
            let read_only = std::fs::metadata(&path)
                .map(|meta| meta.permissions().readonly())
                .unwrap_or(false);
            if read_only {
                issues.push(ConfigurationIssue::new(
                    IssueKind::Permission,
                    Severity::High,
                    format!("No write permission: {}", description),
                    path,
                    "Grant write permissions to the current user",
                ));
            }
        }
        issues
    }

    /// Repairs what can be repaired through the registry writer. The process
    /// environment is updated alongside so a follow-up `verify` sees the
    /// result. Stops at the first privilege error.
    pub fn fix(&self, issues: &[ConfigurationIssue]) -> Result<FixReport, WriteError> {
        let mut report = FixReport::default();

        let repairable: Vec<&ConfigurationIssue> = issues
            .iter()
            .filter(|i| {
                i.kind == IssueKind::Path
                    && (i.description == DUPLICATE_PATH || i.description == MISSING_PATH)
            })
            .collect();
        if !repairable.is_empty() {
            self.fix_path(&repairable, &mut report)?;
        }

        for issue in issues {
            match issue.kind {
                IssueKind::Path => {
                    if issue.description != DUPLICATE_PATH && issue.description != MISSING_PATH {
                        report.manual.push(issue.clone());
                    }
                }
                IssueKind::Env if issue.description.starts_with(MISSING_HOME_PREFIX) => {
                    self.fill_home(issue, &mut report)?
                }
                _ => report.manual.push(issue.clone()),
            }
        }

        Ok(report)
    }

    /// Removes what the writer's scope actually holds. Entries that only
    /// come from the other scope are left for the operator.
    fn fix_path(
        &self,
        issues: &[&ConfigurationIssue],
        report: &mut FixReport,
    ) -> Result<(), WriteError> {
        self.writer.ensure_writable()?;
        let persisted = match self.writer.persisted_path() {
            Ok(raw) => raw,
            Err(err) => {
                let message = err.to_string();
                report
                    .failed
                    .extend(issues.iter().map(|i| ((*i).clone(), message.clone())));
                return Ok(());
            }
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        for entry in split_entries(&persisted) {
            *counts.entry(normalize_path(entry)).or_default() += 1;
        }
        let (owned, elsewhere): (Vec<&ConfigurationIssue>, Vec<&ConfigurationIssue>) =
            issues.iter().copied().partition(|issue| {
                let held = counts.get(&normalize_path(&issue.value)).copied().unwrap_or(0);
                if issue.description == DUPLICATE_PATH {
                    held > 1
                } else {
                    held > 0
                }
            });
        for issue in elsewhere {
            tracing::debug!("{} is not in the {} PATH", issue.value, self.writer.scope());
            report.manual.push(issue.clone());
        }
        if owned.is_empty() {
            return Ok(());
        }

        let duplicates = owned.iter().any(|i| i.description == DUPLICATE_PATH);
        let missing: Vec<String> = owned
            .iter()
            .filter(|i| i.description == MISSING_PATH)
            .map(|i| i.value.clone())
            .collect();

        match self.writer.remove_from_path(&missing, duplicates) {
            Ok(0) => report.manual.extend(owned.into_iter().cloned()),
            Ok(removed) => {
                let (process_path, _) = remove_entries(&self.path_value(), &missing, duplicates);
                self.env.set("Path", &process_path);
                report.fixed.push(format!(
                    "Removed {} PATH entr{} ({} scope)",
                    removed,
                    if removed == 1 { "y" } else { "ies" },
                    self.writer.scope()
                ));
            }
            Err(err @ WriteError::PrivilegeRequired(_)) => return Err(err),
            Err(err) => {
                let message = err.to_string();
                report
                    .failed
                    .extend(owned.into_iter().map(|i| (i.clone(), message.clone())));
            }
        }
        Ok(())
    }

    fn fill_home(&self, issue: &ConfigurationIssue, report: &mut FixReport) -> Result<(), WriteError> {
        let Some(home) = HOME_VARS.iter().find(|h| h.name == issue.value) else {
            report.manual.push(issue.clone());
            return Ok(());
        };
        let Some(found) = self.find_home(home) else {
            report.manual.push(issue.clone());
            return Ok(());
        };

        let value = found.to_string_lossy().to_string();
        match self.writer.set_variable(home.name, &value) {
            Ok(()) => {
                self.env.set(home.name, &value);
                report.fixed.push(format!("Set {}={}", home.name, value));
            }
            Err(err @ WriteError::PrivilegeRequired(_)) => return Err(err),
            Err(err) => report.failed.push((issue.clone(), err.to_string())),
        }
        Ok(())
    }

    fn find_home(&self, home: &HomeVar) -> Option<std::path::PathBuf> {
        home.candidates.iter().find_map(|pattern| {
            let pattern = expand_env_refs(pattern, |name| self.env.get(name))
                .replace('\\', std::path::MAIN_SEPARATOR_STR);
            expand_candidate(&pattern, |name| self.env.get(name))
                .into_iter()
                .next()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{CountingNotifier, FakeProcessEnv, MemoryStore, Probe};
    use crate::registry_writer::PATH_VAR;
    use domain::entities::mutation::Scope;
    use domain::entities::tool::ToolDescriptor;
    use std::fs;
    use tempfile::tempdir;

    fn verifier(
        catalog: Catalog,
        env: Arc<FakeProcessEnv>,
        store: Arc<MemoryStore>,
        probe: Probe,
    ) -> Verifier {
        let writer = RegistryWriter::new(
            store,
            Arc::new(probe),
            Arc::new(CountingNotifier::default()),
            Scope::Machine,
        );
        Verifier::new(Arc::new(catalog), env, Arc::new(writer))
    }

    fn of_kind(issues: &[ConfigurationIssue], kind: IssueKind) -> Vec<&ConfigurationIssue> {
        issues.iter().filter(|i| i.kind == kind).collect()
    }

    #[test]
    fn path_duplicates_missing_and_long_entries() {
        let dir = tempdir().unwrap();
        let real = dir.path().to_string_lossy().to_string();
        let long = format!("{}{}", real, "x".repeat(MAX_PATH_ENTRY_LEN));
        let gone = dir.path().join("gone").to_string_lossy().to_string();
        let path = format!("{real};{real}/;{gone};{long}");

        let env = FakeProcessEnv::from_pairs(&[("Path", path.as_str())]);
        let v = verifier(
            Catalog::default(),
            env,
            Arc::new(MemoryStore::default()),
            Probe::elevated(),
        );

        let issues = v.verify();
        let path_issues = of_kind(&issues, IssueKind::Path);
        let severities: Vec<Severity> = path_issues.iter().map(|i| i.severity).collect();

        assert_eq!(
            severities,
            vec![Severity::Low, Severity::Medium, Severity::Medium, Severity::High]
        );
        assert_eq!(path_issues[1].value, gone);
    }

    #[test]
    fn required_homes_and_credentials() {
        let dir = tempdir().unwrap();
        let java = dir.path().to_string_lossy().to_string();
        let env = FakeProcessEnv::from_pairs(&[
            ("JAVA_HOME", java.as_str()),
            ("GOROOT", "/definitely/not/here"),
            ("PGPASSWORD", "hunter2"),
        ]);
        let v = verifier(
            Catalog::default(),
            env,
            Arc::new(MemoryStore::default()),
            Probe::elevated(),
        );

        let issues = v.verify();
        let env_issues = of_kind(&issues, IssueKind::Env);
        let missing: Vec<&str> = env_issues
            .iter()
            .filter(|i| i.severity == Severity::High)
            .map(|i| i.value.as_str())
            .collect();
        assert_eq!(missing, vec!["PYTHON_HOME", "GOPATH"]);
        assert!(env_issues
            .iter()
            .any(|i| i.severity == Severity::Medium && i.value.starts_with("GOROOT=")));

        let security = of_kind(&issues, IssueKind::Security);
        assert_eq!(security.len(), 1);
        assert_eq!(security[0].value, "PGPASSWORD");
    }

    #[test]
    fn programs_missing_from_candidates_are_reported() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("go/bin")).unwrap();
        fs::write(dir.path().join("go/bin/go.exe"), b"").unwrap();
        let root = dir.path().to_string_lossy().to_string();

        let catalog = Catalog::new(vec![
            ToolDescriptor::new("Go", "go.exe").with_candidates(["%ROOT%/go/bin"]),
            ToolDescriptor::new("Zig", "zig.exe").with_candidates(["%ROOT%/zig"]),
            ToolDescriptor::new("Bare", "bare.exe"),
        ]);
        let env = FakeProcessEnv::from_pairs(&[("ROOT", root.as_str())]);
        let v = verifier(catalog, env, Arc::new(MemoryStore::default()), Probe::elevated());

        let issues = v.verify();
        let programs = of_kind(&issues, IssueKind::Program);
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].value, "zig.exe");
    }

    #[test]
    fn fix_removes_bad_path_entries_and_fills_homes() {
        let dir = tempdir().unwrap();
        let real = dir.path().to_string_lossy().to_string();
        let gone = dir.path().join("gone").to_string_lossy().to_string();
        fs::create_dir_all(dir.path().join("go")).unwrap();

        let path = format!("{real};{gone};{real}");
        let env = FakeProcessEnv::from_pairs(&[
            ("Path", path.as_str()),
            ("USERPROFILE", real.as_str()),
            ("PGPASSWORD", "x"),
        ]);
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, &path));
        let v = verifier(Catalog::default(), env.clone(), store.clone(), Probe::elevated());

        let issues = v.verify();
        let report = v.fix(&issues).unwrap();

        assert_eq!(store.get(Scope::Machine, PATH_VAR).unwrap(), real);
        assert_eq!(env.get("Path").unwrap(), real);
        let gopath = dir.path().join("go").to_string_lossy().to_string();
        assert_eq!(store.get(Scope::Machine, "GOPATH").unwrap(), gopath);
        assert!(report.manual.iter().any(|i| i.kind == IssueKind::Security));
        assert!(report.failed.is_empty());

        let after = v.verify();
        assert!(of_kind(&after, IssueKind::Path).is_empty());
    }

    #[test]
    fn fix_without_privilege_is_refused() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("gone").to_string_lossy().to_string();
        let env = FakeProcessEnv::from_pairs(&[("Path", gone.as_str())]);
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, &gone));
        let v = verifier(Catalog::default(), env, store.clone(), Probe::denied());

        let issues = v.verify();
        assert!(matches!(v.fix(&issues), Err(WriteError::PrivilegeRequired(_))));
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn fix_leaves_entries_from_the_other_scope_alone() {
        let dir = tempdir().unwrap();
        let real = dir.path().to_string_lossy().to_string();
        let gone = dir.path().join("gone").to_string_lossy().to_string();

        let path = format!("{real};{gone}");
        let env = FakeProcessEnv::from_pairs(&[("Path", path.as_str())]);
        let store = Arc::new(MemoryStore::with(Scope::Machine, PATH_VAR, &real));
        store.insert(Scope::User, PATH_VAR, &gone);
        let v = verifier(Catalog::default(), env.clone(), store.clone(), Probe::elevated());

        let issues = v.verify();
        let report = v.fix(&issues).unwrap();

        assert!(report.fixed.iter().all(|line| !line.contains("PATH")));
        assert!(report
            .manual
            .iter()
            .any(|i| i.description == MISSING_PATH && i.value == gone));
        assert_eq!(store.get(Scope::Machine, PATH_VAR).unwrap(), real);
        assert_eq!(store.get(Scope::User, PATH_VAR).unwrap(), gone);
        assert_eq!(env.get("Path").unwrap(), path);
    }
}
