use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error in {path}: {message}")]
    Catalog { path: String, message: String },

    #[error("Administrator privileges are required to change the {0} environment")]
    PrivilegeRequired(String),

    #[error("Unknown backup '{0}'")]
    UnknownBackup(String),

    #[error("Nothing selected")]
    EmptySelection,

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl CliError {
    /// Returns a themed, actionable suggestion for the error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Config(_) => Some(
                "Check ~/.devpath/config.toml (or the file named by DEVPATH_CONFIG) for syntax errors."
                    .to_string(),
            ),
            CliError::Catalog { .. } => {
                Some("Fix the catalog file or remove `catalog_file` from your settings.".to_string())
            }
            CliError::PrivilegeRequired(_) => {
                Some("Re-run from an elevated (Administrator) terminal.".to_string())
            }
            CliError::UnknownBackup(_) => {
                Some("Run `devpath backup list` to see the available backups.".to_string())
            }
            CliError::EmptySelection => {
                Some("Use numbers from `devpath catalog`, ranges like 3-5, `all` or `category:<name>`.".to_string())
            }
            _ => None,
        }
    }

    pub fn render(&self) {
        eprintln!("\n{} {}", console::style("Error:").red().bold(), self);
        if let Some(s) = self.suggestion() {
            eprintln!("{} {}", console::style("  help:").dim(), s);
        }
    }
}
