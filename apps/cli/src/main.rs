pub mod ui;

mod commands;
mod core;
mod logging;

use clap::{Parser, Subcommand};

use crate::core::error::CliError;
use crate::core::settings::SettingsService;

#[derive(Parser)]
#[command(name = "devpath")]
#[command(about = "Find developer tools and wire them into the Windows environment", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (the default)
    Menu(commands::menu::MenuCommand),
    /// Locate tools and configure PATH and variables for them
    Search(commands::search::SearchCommand),
    /// Check PATH and tool variables for problems
    Verify(commands::verify::VerifyCommand),
    /// Show the current environment
    Env(commands::env::EnvCommand),
    /// Create, list or restore environment backups
    Backup(commands::backup::BackupCommand),
    /// Print the numbered tool catalog
    Catalog(commands::catalog::CatalogCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Ok(service) = SettingsService::new() {
        if let Err(err) = logging::init_logging(service.config_dir()) {
            eprintln!("Logging disabled: {}", err);
        }
    }

    let result = match cli.command {
        None => commands::menu::MenuCommand::default().execute().await,
        Some(Commands::Menu(cmd)) => cmd.execute().await,
        Some(Commands::Search(cmd)) => cmd.execute().await,
        Some(Commands::Verify(cmd)) => cmd.execute().await,
        Some(Commands::Env(cmd)) => cmd.execute().await,
        Some(Commands::Backup(cmd)) => cmd.execute().await,
        Some(Commands::Catalog(cmd)) => cmd.execute().await,
    };

    if let Err(err) = result {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            cli_err.render();
            std::process::exit(1);
        }
        return Err(err);
    }

    Ok(())
}
