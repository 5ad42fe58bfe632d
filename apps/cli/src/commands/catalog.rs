use anyhow::Result;
use clap::Parser;
use comfy_table::{Cell, Color, Table};

use devpath::domain::entities::catalog::Catalog;

use crate::core::context::load_catalog;
use crate::core::settings::SettingsService;
use crate::ui::table::new_table;

#[derive(Parser, Debug)]
pub struct CatalogCommand {}

impl CatalogCommand {
    pub async fn execute(self) -> Result<()> {
        let settings = SettingsService::new()?.load()?;
        let catalog = load_catalog(&settings)?;
        print_catalog(&catalog);
        Ok(())
    }
}

pub fn print_catalog(catalog: &Catalog) {
    crate::ui::println(catalog_table(catalog).to_string());
}

/// One row per tool, numbered the way the selection grammar counts.
pub fn catalog_table(catalog: &Catalog) -> Table {
    let mut table = new_table(&["#", "Category", "Tool", "Executable"]);
    let mut last_category: Option<&str> = None;

    for (number, tool) in catalog.numbered() {
        let category = if last_category == Some(tool.category.as_str()) {
            String::new()
        } else {
            tool.category.clone()
        };
        last_category = Some(tool.category.as_str());

        table.add_row(vec![
            Cell::new(number).fg(Color::Cyan),
            Cell::new(category).fg(Color::Yellow),
            Cell::new(&tool.name),
            Cell::new(&tool.executable).fg(Color::DarkGrey),
        ]);
    }
    table
}
