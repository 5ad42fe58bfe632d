use anyhow::Result;
use clap::Parser;

use crate::commands::search::{offer_restart, prompt_selection, SearchCommand, SearchSession};
use crate::commands::{backup, env, verify};
use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::core::selection::{parse_selection, resolve, Selection};

#[derive(Parser, Debug, Default)]
pub struct MenuCommand {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Search,
    Verify,
    Environment,
    ToolHomes,
    Backups,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackupItem {
    Create,
    List,
    Restore,
    Back,
}

impl MenuCommand {
    pub async fn execute(self) -> Result<()> {
        cliclack::intro(console::style("DevPath").bold())?;
        let ctx = AppContext::load()?;

        loop {
            let item = cliclack::select("What would you like to do?")
                .item(MenuItem::Search, "Search & configure tools", "")
                .item(MenuItem::Verify, "Verify configuration", "")
                .item(MenuItem::Environment, "View environment", "")
                .item(MenuItem::ToolHomes, "View tool variables", "")
                .item(MenuItem::Backups, "Manage backups", "")
                .item(MenuItem::Exit, "Exit", "")
                .interact()?;

            let outcome = match item {
                MenuItem::Search => search(&ctx).await,
                MenuItem::Verify => verify::run(&ctx, false, true),
                MenuItem::Environment => env::show_variables(&ctx),
                MenuItem::ToolHomes => env::show_tools(&ctx).await,
                MenuItem::Backups => backups(&ctx),
                MenuItem::Exit => break,
            };

            // Operator-facing errors are shown and the menu stays open.
            if let Err(err) = outcome {
                match err.downcast_ref::<CliError>() {
                    Some(cli_err) => cli_err.render(),
                    None => cliclack::log::error(format!("{:#}", err))?,
                }
            }
        }

        cliclack::outro("Bye!")?;
        Ok(())
    }
}

async fn search(ctx: &AppContext) -> Result<()> {
    let input = prompt_selection(ctx)?;
    let numbers = match parse_selection(&input, &ctx.catalog) {
        Selection::Back => return Ok(()),
        Selection::Numbers(numbers) if numbers.is_empty() => {
            return Err(CliError::EmptySelection.into())
        }
        Selection::Numbers(numbers) => numbers,
    };

    let tools = resolve(&numbers, &ctx.catalog);
    let changed = SearchSession::new(ctx, &SearchCommand::default())
        .run(&tools)
        .await?;
    if changed && offer_restart()? {
        std::process::exit(0);
    }
    Ok(())
}

fn backups(ctx: &AppContext) -> Result<()> {
    let item = cliclack::select("Backups")
        .item(BackupItem::Create, "Create a backup", "")
        .item(BackupItem::List, "List backups", "")
        .item(BackupItem::Restore, "Restore a backup", "")
        .item(BackupItem::Back, "Back", "")
        .interact()?;

    match item {
        BackupItem::Create => backup::create(ctx),
        BackupItem::List => backup::list(ctx),
        BackupItem::Restore => match backup::choose(ctx)? {
            Some(stamp) => backup::restore(ctx, &stamp, false),
            None => Ok(()),
        },
        BackupItem::Back => Ok(()),
    }
}
