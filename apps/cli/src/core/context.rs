use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use devpath::application::{BackupService, ConfigureService, Locator, RegistryWriter, Verifier};
use devpath::domain::entities::catalog::{Catalog, CatalogError};
use devpath::domain::entities::settings::Settings;
use devpath::infrastructure::PlatformAdapters;

use crate::core::error::CliError;
use crate::core::settings::SettingsService;
use crate::ui::diagnostic::report_catalog_error;

/// Everything a command needs, wired once from the settings file.
pub struct AppContext {
    pub settings: Settings,
    pub catalog: Arc<Catalog>,
    pub adapters: PlatformAdapters,
    pub writer: Arc<RegistryWriter>,
    pub locator: Locator,
    pub configurator: ConfigureService,
    pub backups: BackupService,
    pub verifier: Verifier,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let service = SettingsService::new()?;
        let settings = service
            .load()
            .map_err(|err| CliError::Config(format!("{:#}", err)))?;

        let catalog = Arc::new(load_catalog(&settings)?);
        let adapters = PlatformAdapters::for_settings(&settings);
        let writer = Arc::new(RegistryWriter::from_adapters(&adapters, &settings));

        tracing::debug!(
            "Settings from {}: {} tools, scope {}, backups in {}",
            service.settings_path().display(),
            catalog.len(),
            settings.scope,
            service.backup_dir(&settings).display()
        );

        Ok(Self {
            locator: Locator::from_adapters(&adapters, &settings.search),
            configurator: ConfigureService::new(
                catalog.clone(),
                writer.clone(),
                adapters.process_env.clone(),
            ),
            backups: BackupService::new(
                service.backup_dir(&settings),
                settings.scope,
                adapters.snapshot.clone(),
                adapters.process_env.clone(),
            ),
            verifier: Verifier::new(catalog.clone(), adapters.process_env.clone(), writer.clone()),
            settings,
            catalog,
            adapters,
            writer,
        })
    }
}

/// The built-in catalog with the user's catalog file layered on top.
pub fn load_catalog(settings: &Settings) -> Result<Catalog> {
    let builtin = Catalog::builtin().context("Built-in catalog is invalid")?;
    let Some(path) = &settings.catalog_file else {
        return Ok(builtin);
    };

    let overrides = read_user_catalog(path)?;
    tracing::info!("Merged {} tools from {}", overrides.len(), path.display());
    Ok(builtin.merge(overrides))
}

fn read_user_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        CliError::Config(format!("Cannot read catalog file {}: {}", path.display(), err))
    })?;

    Catalog::from_toml_str(&content).map_err(|err| {
        let display = path.display().to_string();
        let (message, span) = match &err {
            CatalogError::Parse(parse) => (parse.message().to_string(), parse.span()),
            CatalogError::Duplicate(name)
            | CatalogError::EmptyExecutable(name)
            | CatalogError::DuplicateProfile(name) => (
                err.to_string(),
                content.find(name.as_str()).map(|at| at..at + name.len()),
            ),
        };
        report_catalog_error(&display, &content, &message, span);
        CliError::Catalog {
            path: display,
            message,
        }
        .into()
    })
}
