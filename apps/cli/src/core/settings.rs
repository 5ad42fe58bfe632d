use anyhow::{Context, Result};
use devpath::domain::entities::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "DEVPATH_CONFIG";

pub struct SettingsService {
    config_dir: PathBuf,
    settings_path: PathBuf,
}

impl SettingsService {
    /// Resolves `DEVPATH_CONFIG` or `~/.devpath/config.toml`, ensuring the
    /// config directory exists.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let config_dir = home.join(".devpath");

        let settings_path = match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => config_dir.join("config.toml"),
        };

        Self::at(config_dir, settings_path)
    }

    pub fn at(config_dir: PathBuf, settings_path: PathBuf) -> Result<Self> {
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create config dir")?;
        }
        Ok(Self {
            config_dir,
            settings_path,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings. A missing file yields the defaults, which are written
    /// out so there is something to edit.
    pub fn load(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            let settings = Settings::default();
            if let Err(err) = self.save(&settings) {
                tracing::warn!("Could not write default settings: {:#}", err);
            }
            return Ok(settings);
        }

        let content = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read {}", self.settings_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.settings_path.display()))
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        fs::write(&self.settings_path, content).context("Failed to write settings")?;
        Ok(())
    }

    /// Where backups go when `backup_dir` is not configured.
    pub fn backup_dir(&self, settings: &Settings) -> PathBuf {
        settings
            .backup_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join("backups"))
    }
}
