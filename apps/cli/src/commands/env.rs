use anyhow::Result;
use clap::Parser;
use comfy_table::{Cell, Color};

use devpath::domain::system::path_list::split_entries;
use devpath::domain::ToolDescriptor;

use crate::core::context::AppContext;
use crate::ui::table::{new_table, variables_table};

#[derive(Parser, Debug, Default)]
pub struct EnvCommand {
    /// Show each catalog tool's home variable instead of the raw environment
    #[arg(long)]
    pub tools: bool,
}

impl EnvCommand {
    pub async fn execute(self) -> Result<()> {
        let ctx = AppContext::load()?;
        if self.tools {
            show_tools(&ctx).await
        } else {
            show_variables(&ctx)
        }
    }
}

/// The process environment, sorted by name, with PATH split one entry per
/// line.
pub fn show_variables(ctx: &AppContext) -> Result<()> {
    let vars = ctx.adapters.process_env.vars();
    let rendered: Vec<(String, String)> = vars
        .into_iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("path") {
                let entries = split_entries(&value).join("\n");
                (name, entries)
            } else {
                (name, value)
            }
        })
        .collect();

    let table = variables_table(rendered.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    crate::ui::println(table.to_string());
    Ok(())
}

/// Variable that points at a tool's install, from its profile or `<NAME>_HOME`.
pub fn home_var(ctx: &AppContext, tool: &ToolDescriptor) -> String {
    ctx.catalog
        .profile_for(&tool.name)
        .and_then(|p| p.home_var.clone())
        .unwrap_or_else(|| format!("{}_HOME", tool.name.to_uppercase().replace(['-', ' '], "_")))
}

pub async fn show_tools(ctx: &AppContext) -> Result<()> {
    let mut table = new_table(&["Tool", "Variable", "Value", "Status"]);

    for tool in ctx.catalog.tools() {
        let var = home_var(ctx, tool);
        let (value, status) = match ctx.adapters.process_env.get(&var) {
            Some(value) if !value.is_empty() => (value, Cell::new("set").fg(Color::Green)),
            _ => {
                let found = ctx.locator.locate_targeted(tool).await;
                match found.paths.first().and_then(|p| p.parent()) {
                    Some(dir) => (
                        dir.display().to_string(),
                        Cell::new("found, not set").fg(Color::Yellow),
                    ),
                    None => ("-".to_string(), Cell::new("not found").fg(Color::Red)),
                }
            }
        };

        table.add_row(vec![
            Cell::new(&tool.name),
            Cell::new(var).fg(Color::Magenta),
            Cell::new(value),
            status,
        ]);
    }

    crate::ui::println(table.to_string());
    Ok(())
}
