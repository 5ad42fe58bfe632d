use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;

use domain::entities::backup::{BackupStamp, EnvironmentBackup};
use domain::entities::mutation::Scope;
use domain::ports::environment_store::RegistrySnapshot;
use domain::ports::process_env::ProcessEnvironment;

/// Timestamped `registry_<stamp>.reg` + `env_<stamp>.json` pairs in one
/// directory.
pub struct BackupService {
    dir: PathBuf,
    scope: Scope,
    snapshot: Arc<dyn RegistrySnapshot>,
    env: Arc<dyn ProcessEnvironment>,
}

impl BackupService {
    pub fn new(
        dir: impl Into<PathBuf>,
        scope: Scope,
        snapshot: Arc<dyn RegistrySnapshot>,
        env: Arc<dyn ProcessEnvironment>,
    ) -> Self {
        Self {
            dir: dir.into(),
            scope,
            snapshot,
            env,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn create(&self) -> Result<BackupStamp> {
        self.create_at(BackupStamp::now())
    }

    /// Stamps have one-second resolution; an existing pair is never
    /// overwritten.
    fn create_at(&self, stamp: BackupStamp) -> Result<BackupStamp> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create backup directory {}", self.dir.display()))?;

        let registry_file = self.dir.join(stamp.registry_file_name());
        let env_file = self.dir.join(stamp.env_file_name());
        if registry_file.exists() || env_file.exists() {
            bail!(
                "Backup {} already exists in {}; wait a second and try again",
                stamp,
                self.dir.display()
            );
        }
        self.snapshot
            .export(self.scope, &registry_file)
            .with_context(|| format!("Failed to export the {} environment key", self.scope))?;

        let backup = EnvironmentBackup {
            timestamp: Local::now(),
            variables: self.env.vars(),
        };
        let json = serde_json::to_string_pretty(&backup)?;
        fs::write(&env_file, json)
            .with_context(|| format!("Failed to write {}", env_file.display()))?;

        tracing::info!("Created backup {} in {}", stamp, self.dir.display());
        Ok(stamp)
    }

    /// Re-imports the registry export, then re-applies the saved variables to
    /// this process.
    pub fn restore(&self, stamp: &BackupStamp) -> Result<()> {
        let registry_file = self.dir.join(stamp.registry_file_name());
        if !registry_file.is_file() {
            bail!("Backup {} not found in {}", stamp, self.dir.display());
        }

        let env_file = self.dir.join(stamp.env_file_name());
        let content = fs::read_to_string(&env_file)
            .with_context(|| format!("Failed to read {}", env_file.display()))?;
        let backup: EnvironmentBackup = serde_json::from_str(&content)
            .with_context(|| format!("Malformed backup file {}", env_file.display()))?;

        self.snapshot
            .import(&registry_file)
            .with_context(|| format!("Failed to import {}", registry_file.display()))?;

        for (name, value) in &backup.variables {
            self.env.set(name, value);
        }

        tracing::info!(
            "Restored backup {} ({} variables)",
            stamp,
            backup.variables.len()
        );
        Ok(())
    }

    /// Every backup in the directory, oldest first.
    pub fn list(&self) -> Result<Vec<BackupStamp>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut stamps = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?
        {
            let entry = entry?;
            if let Some(stamp) = BackupStamp::from_registry_file_name(&entry.file_name().to_string_lossy()) {
                stamps.push(stamp);
            }
        }
        stamps.sort();
        Ok(stamps)
    }

    pub fn latest(&self) -> Result<Option<BackupStamp>> {
        Ok(self.list()?.pop())
    }
}
