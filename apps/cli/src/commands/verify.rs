use anyhow::Result;
use clap::Parser;

use devpath::application::WriteError;

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::components::spinner::Spinner;
use crate::ui::table::issues_table;
use crate::ui::{Icon, Theme};

#[derive(Parser, Debug, Default)]
pub struct VerifyCommand {
    /// Repair what can be repaired automatically
    #[arg(long)]
    pub fix: bool,
}

impl VerifyCommand {
    pub async fn execute(self) -> Result<()> {
        cliclack::intro(console::style("DevPath Verify").bold())?;
        let ctx = AppContext::load()?;
        run(&ctx, self.fix, false)?;
        cliclack::outro("Done.")?;
        Ok(())
    }
}

/// Runs the checks and, when asked (or confirmed), the fix pass.
pub fn run(ctx: &AppContext, fix: bool, offer_fix: bool) -> Result<()> {
    let spinner = Spinner::new("Verifying");
    spinner.set_message("PATH, tool homes, credentials");
    let issues = ctx.verifier.verify();

    if issues.is_empty() {
        spinner.success("no problems found");
        cliclack::log::success(format!("{} Environment looks healthy", Icon::Check))?;
        return Ok(());
    }
    spinner.fail(format!("{} problem(s) found", issues.len()));
    crate::ui::println(issues_table(&issues).to_string());

    let fix = fix
        || (offer_fix
            && cliclack::confirm("Try to fix these automatically?")
                .initial_value(false)
                .interact()?);
    if !fix {
        cliclack::log::remark("Run `devpath verify --fix` to repair what can be repaired.")?;
        return Ok(());
    }

    let report = match ctx.verifier.fix(&issues) {
        Ok(report) => report,
        Err(WriteError::PrivilegeRequired(scope)) => {
            return Err(CliError::PrivilegeRequired(scope.to_string()).into())
        }
        Err(err) => return Err(err.into()),
    };

    for fixed in &report.fixed {
        cliclack::log::success(fixed)?;
    }
    for (issue, error) in &report.failed {
        cliclack::log::error(format!("{} ({}): {}", issue.description, issue.value, error))?;
    }
    for issue in &report.manual {
        cliclack::log::warning(format!(
            "{} {}: {}",
            Theme::warning(issue.kind),
            issue.value,
            issue.solution
        ))?;
    }

    cliclack::log::info(format!(
        "Fixed {}, {} need attention",
        report.fixed.len(),
        report.manual.len() + report.failed.len()
    ))?;
    Ok(())
}
