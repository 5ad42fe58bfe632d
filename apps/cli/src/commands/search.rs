use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use devpath::application::configurator::ConfigureError;
use devpath::application::{ConfigureReport, LocateResult};
use devpath::domain::entities::tool::ToolDescriptor;
use devpath::infrastructure::system::power;

use crate::commands::catalog::print_catalog;
use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::core::selection::{parse_selection, resolve, Selection};
use crate::ui::components::spinner::Spinner;
use crate::ui::table::variables_table;
use crate::ui::{Icon, Theme};

#[derive(Parser, Debug, Default)]
pub struct SearchCommand {
    /// Tools to configure: `1,3,5`, `2-4`, `all` or `category:<name>`
    pub selection: Option<String>,

    /// Search every drive for tools missing from the usual locations
    #[arg(long)]
    pub deep: bool,

    /// Accept the first match and apply without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Skip the backup taken before the first change
    #[arg(long)]
    pub no_backup: bool,
}

impl SearchCommand {
    pub async fn execute(self) -> Result<()> {
        cliclack::intro(console::style("DevPath Search").bold())?;
        let ctx = AppContext::load()?;

        let input = match &self.selection {
            Some(input) => input.clone(),
            None => prompt_selection(&ctx)?,
        };

        let numbers = match parse_selection(&input, &ctx.catalog) {
            Selection::Back => {
                cliclack::outro("Nothing to do.")?;
                return Ok(());
            }
            Selection::Numbers(numbers) if numbers.is_empty() => {
                return Err(CliError::EmptySelection.into())
            }
            Selection::Numbers(numbers) => numbers,
        };

        let tools = resolve(&numbers, &ctx.catalog);
        let changed = SearchSession::new(&ctx, &self).run(&tools).await?;
        finish(changed, self.yes)
    }
}

/// Shows the catalog and reads a selection.
pub fn prompt_selection(ctx: &AppContext) -> Result<String> {
    print_catalog(&ctx.catalog);
    let input: String = cliclack::input("Select tools")
        .placeholder("1,3,5 | 2-4 | all | category:<name> | back")
        .interact()?;
    Ok(input)
}

/// Closes the session, offering the restart that makes every process see
/// the new environment.
pub fn finish(changed: bool, yes: bool) -> Result<()> {
    if !changed {
        cliclack::outro("No changes were made.")?;
        return Ok(());
    }

    // Never reboot unattended.
    if !yes && offer_restart()? {
        return Ok(());
    }

    cliclack::outro(format!(
        "{} Configuration updated. Open a new terminal (or restart) to use it.",
        Icon::Check
    ))?;
    Ok(())
}

/// Returns true when a restart was requested.
pub fn offer_restart() -> Result<bool> {
    let restart = cliclack::confirm("Restart now so every program picks up the new environment?")
        .initial_value(false)
        .interact()?;
    if restart {
        cliclack::outro("Restarting...")?;
        power::restart_now()?;
    }
    Ok(restart)
}

pub struct SearchSession<'a> {
    ctx: &'a AppContext,
    deep: bool,
    yes: bool,
    backed_up: bool,
    changed: bool,
}

impl<'a> SearchSession<'a> {
    pub fn new(ctx: &'a AppContext, options: &SearchCommand) -> Self {
        Self {
            ctx,
            deep: options.deep,
            yes: options.yes,
            backed_up: options.no_backup,
            changed: false,
        }
    }

    /// Locates and configures each tool. Returns whether anything was
    /// persisted.
    pub async fn run(mut self, tools: &[&ToolDescriptor]) -> Result<bool> {
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        cliclack::log::info(format!("Selected: {}", names.join(", ")))?;

        let mut not_found = Vec::new();
        for tool in tools {
            let spinner = Spinner::new(format!("{} {}", Icon::Search, tool.name));
            spinner.set_message("searching common locations");
            let result = self.ctx.locator.locate_targeted(tool).await;
            log_issues(tool, &result);

            if result.is_empty() {
                spinner.fail("not found in common locations");
                not_found.push(*tool);
                continue;
            }
            spinner.success(format!("{} location(s)", result.paths.len()));
            self.configure(tool, &result.paths)?;
        }

        if !not_found.is_empty() && self.wants_deep_search(not_found.len())? {
            for tool in not_found {
                let spinner = Spinner::new(format!("{} {}", Icon::Search, tool.name));
                spinner.set_message("searching every drive");
                let result = self.ctx.locator.locate_everywhere(tool).await;
                log_issues(tool, &result);

                if result.is_empty() {
                    spinner.fail("not found on any drive");
                    continue;
                }
                spinner.success(format!("{} location(s)", result.paths.len()));
                self.configure(tool, &result.paths)?;
            }
        }

        Ok(self.changed)
    }

    fn wants_deep_search(&self, missing: usize) -> Result<bool> {
        if self.deep {
            return Ok(true);
        }
        if !self.ctx.locator.config().full_volume_fallback {
            cliclack::log::info(
                "Full-drive search is disabled in settings. Pass --deep to run it anyway.",
            )?;
            return Ok(false);
        }
        if self.yes {
            return Ok(true);
        }

        let answer = cliclack::confirm(format!(
            "{} tool(s) were not found in common locations. Search every drive? This may take several minutes.",
            missing
        ))
        .initial_value(false)
        .interact()?;
        Ok(answer)
    }

    fn configure(&mut self, tool: &ToolDescriptor, paths: &[PathBuf]) -> Result<()> {
        cliclack::log::step(format!("{} {}", Icon::Gear, Theme::primary(&tool.name)))?;

        let executable = self.choose_path(tool, paths)?;
        let groups = self.choose_groups(tool)?;

        let plan = match self.ctx.configurator.plan(tool, &executable, groups.as_deref()) {
            Ok(plan) => plan,
            Err(err) => {
                cliclack::log::error(format!("{}", err))?;
                return Ok(());
            }
        };

        let mut preview = format!("PATH += {}", plan.path_entries.join("; "));
        if !plan.variables.is_empty() {
            let rows = plan.variables.iter().map(|(k, v)| (k.as_str(), v.as_str()));
            preview = format!("{}\n{}", preview, variables_table(rows));
        }
        cliclack::log::info(preview)?;

        if !self.yes && !cliclack::confirm("Apply these changes?").initial_value(true).interact()? {
            cliclack::log::remark(format!("Skipped {}", tool.name))?;
            return Ok(());
        }

        self.ensure_backup()?;

        match self.ctx.configurator.configure(tool, &executable, groups.as_deref()) {
            Ok(report) => {
                report_outcome(&report)?;
                self.changed |= report.changed();
            }
            Err(ConfigureError::Privilege(_)) => {
                CliError::PrivilegeRequired(self.ctx.writer.scope().to_string()).render();
            }
            Err(ConfigureError::Template(err)) => {
                cliclack::log::error(format!("{}", err))?;
            }
        }
        Ok(())
    }

    fn choose_path(&self, tool: &ToolDescriptor, paths: &[PathBuf]) -> Result<PathBuf> {
        if paths.len() == 1 || self.yes {
            return Ok(paths[0].clone());
        }

        let mut prompt = cliclack::select(format!("Several {} installations found", tool.name));
        for (i, path) in paths.iter().enumerate() {
            let hint = if i == 0 { "first match" } else { "" };
            prompt = prompt.item(path.clone(), path.display(), hint);
        }
        Ok(prompt.interact()?)
    }

    /// `None` means every variable.
    fn choose_groups(&self, tool: &ToolDescriptor) -> Result<Option<Vec<String>>> {
        let Some(profile) = self.ctx.catalog.profile_for(&tool.name) else {
            return Ok(None);
        };
        if profile.groups.is_empty() || self.yes {
            return Ok(None);
        }

        let all: Vec<String> = profile.groups.iter().map(|g| g.name.clone()).collect();
        let mut prompt = cliclack::multiselect("Which variable groups should be set?");
        for group in &profile.groups {
            prompt = prompt.item(group.name.clone(), &group.name, &group.description);
        }

        let picked: Vec<String> = prompt
            .initial_values(all.clone())
            .required(false)
            .interact()?;
        if picked.len() == all.len() {
            Ok(None)
        } else {
            Ok(Some(picked))
        }
    }

    fn ensure_backup(&mut self) -> Result<()> {
        if self.backed_up {
            return Ok(());
        }
        self.backed_up = true;

        match self.ctx.backups.create() {
            Ok(stamp) => cliclack::log::info(format!(
                "{} Backup {} saved to {}",
                Icon::Shield,
                Theme::bold(&stamp),
                Theme::muted(self.ctx.backups.dir().display())
            ))?,
            Err(err) => cliclack::log::warning(format!("Failed to create backup: {:#}", err))?,
        }
        Ok(())
    }
}

fn log_issues(tool: &ToolDescriptor, result: &LocateResult) {
    for issue in &result.issues {
        tracing::debug!("{}: {} ({})", tool.name, issue.message, issue.path.display());
    }
    if !result.issues.is_empty() {
        tracing::info!(
            "{}: {} location(s) could not be searched",
            tool.name,
            result.issues.len()
        );
    }
}

fn report_outcome(report: &ConfigureReport) -> Result<()> {
    for entry in &report.path_added {
        cliclack::log::success(format!("PATH += {}", entry))?;
    }
    for entry in &report.path_present {
        cliclack::log::remark(format!("Already on PATH: {}", Theme::muted(entry)))?;
    }
    for (name, value) in &report.variables_written {
        cliclack::log::success(format!("{} = {}", Theme::secondary(name), value))?;
    }
    for name in &report.variables_unchanged {
        cliclack::log::remark(format!("{} already set", Theme::secondary(name)))?;
    }
    for failure in &report.failures {
        cliclack::log::error(format!("{}: {}", failure.mutation, failure.error))?;
    }

    let executable = display_path(&report.executable);
    if report.failures.is_empty() {
        cliclack::log::success(format!("{} configured using {}", report.tool, executable))?;
    } else {
        cliclack::log::warning(format!(
            "{} partially configured ({} failed)",
            report.tool,
            report.failures.len()
        ))?;
    }
    Ok(())
}

fn display_path(path: &Path) -> String {
    Theme::muted(path.display())
}
