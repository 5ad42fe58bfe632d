use anyhow::Result;
use clap::{Parser, Subcommand};

use devpath::domain::entities::backup::BackupStamp;

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::{Icon, Theme};

#[derive(Parser, Debug)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub action: BackupAction,

    /// Restore without asking for confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum BackupAction {
    /// Export the environment key and the process environment
    Create,
    /// List saved backups, oldest first
    List,
    /// Re-import a backup by stamp (or `latest`)
    Restore { stamp: String },
}

impl BackupCommand {
    pub async fn execute(self) -> Result<()> {
        let ctx = AppContext::load()?;
        match self.action {
            BackupAction::Create => create(&ctx),
            BackupAction::List => list(&ctx),
            BackupAction::Restore { stamp } => {
                let stamp = resolve_stamp(&ctx, &stamp)?;
                restore(&ctx, &stamp, self.yes)
            }
        }
    }
}

pub fn create(ctx: &AppContext) -> Result<()> {
    let stamp = ctx.backups.create()?;
    cliclack::log::success(format!(
        "{} Backup {} saved to {}",
        Icon::Shield,
        Theme::bold(&stamp),
        Theme::muted(ctx.backups.dir().display())
    ))?;
    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let stamps = ctx.backups.list()?;
    if stamps.is_empty() {
        cliclack::log::info(format!(
            "No backups in {}",
            Theme::muted(ctx.backups.dir().display())
        ))?;
        return Ok(());
    }

    for stamp in &stamps {
        crate::ui::println(format!("  {} {}", Icon::Package, stamp));
    }
    Ok(())
}

/// Accepts an exact stamp or `latest`.
pub fn resolve_stamp(ctx: &AppContext, raw: &str) -> Result<BackupStamp> {
    let stamp = if raw.eq_ignore_ascii_case("latest") {
        ctx.backups.latest()?
    } else {
        BackupStamp::parse(raw.trim())
    };

    match stamp {
        Some(stamp) if ctx.backups.list()?.contains(&stamp) => Ok(stamp),
        _ => Err(CliError::UnknownBackup(raw.to_string()).into()),
    }
}

/// Lets the operator pick from the saved backups, newest first.
pub fn choose(ctx: &AppContext) -> Result<Option<BackupStamp>> {
    let stamps = ctx.backups.list()?;
    if stamps.is_empty() {
        cliclack::log::info("No backups yet.")?;
        return Ok(None);
    }

    let mut prompt = cliclack::select("Restore which backup?");
    for (i, stamp) in stamps.iter().rev().enumerate() {
        let hint = if i == 0 { "latest" } else { "" };
        prompt = prompt.item(stamp.clone(), stamp.as_str(), hint);
    }
    Ok(Some(prompt.interact()?))
}

pub fn restore(ctx: &AppContext, stamp: &BackupStamp, yes: bool) -> Result<()> {
    if !yes
        && !cliclack::confirm(format!(
            "Replace the {} environment with backup {}?",
            ctx.settings.scope, stamp
        ))
        .initial_value(false)
        .interact()?
    {
        return Err(CliError::Cancelled.into());
    }

    ctx.backups.restore(stamp)?;
    cliclack::log::success(format!("{} Restored backup {}", Icon::Check, Theme::bold(stamp)))?;
    cliclack::log::remark("Open a new terminal (or restart) to see the restored values.")?;
    Ok(())
}
