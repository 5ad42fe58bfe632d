use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use devpath::domain::entities::issue::{ConfigurationIssue, Severity};

pub fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

fn severity_cell(severity: Severity) -> Cell {
    let color = match severity {
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::DarkGrey,
    };
    Cell::new(severity).fg(color)
}

/// Verifier findings, most severe first.
pub fn issues_table(issues: &[ConfigurationIssue]) -> Table {
    let mut sorted: Vec<&ConfigurationIssue> = issues.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut table = new_table(&["Severity", "Type", "Problem", "Value", "Fix"]);
    for issue in sorted {
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(issue.kind),
            Cell::new(&issue.description),
            Cell::new(&issue.value),
            Cell::new(&issue.solution),
        ]);
    }
    table
}

/// `NAME = value` rows.
pub fn variables_table<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> Table {
    let mut table = new_table(&["Variable", "Value"]);
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name).fg(Color::Magenta), Cell::new(value)]);
    }
    table
}
