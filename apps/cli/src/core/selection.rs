//! Tool selection grammar: `1,3,5`, `2-4`, `all`, `category:<name>`, `back`.

use devpath::domain::entities::catalog::Catalog;
use devpath::domain::entities::tool::{names_match, ToolDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Back,
    /// Catalog numbers in the order they were first named.
    Numbers(Vec<usize>),
}

/// Parses operator input against the catalog numbering. Items that are
/// invalid or out of range are dropped.
pub fn parse_selection(input: &str, catalog: &Catalog) -> Selection {
    let numbered = catalog.numbered();
    let max = numbered.len();
    let mut picked: Vec<usize> = Vec::new();
    let mut push = |n: usize| {
        if (1..=max).contains(&n) && !picked.contains(&n) {
            picked.push(n);
        }
    };

    for item in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let lower = item.to_lowercase();
        if lower == "back" {
            return Selection::Back;
        }
        if lower == "all" {
            (1..=max).for_each(&mut push);
            continue;
        }
        if let Some(category) = lower.strip_prefix("category:") {
            let category = category.trim();
            numbered
                .iter()
                .filter(|(_, tool)| names_match(&tool.category, category))
                .for_each(|(n, _)| push(*n));
            continue;
        }
        if let Some((start, end)) = item.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
                if start <= end {
                    (start..=end).for_each(&mut push);
                }
            }
            continue;
        }
        if let Ok(n) = item.parse::<usize>() {
            push(n);
        }
    }

    Selection::Numbers(picked)
}

/// Descriptors for the selected numbers.
pub fn resolve<'a>(numbers: &[usize], catalog: &'a Catalog) -> Vec<&'a ToolDescriptor> {
    let numbered = catalog.numbered();
    numbers
        .iter()
        .filter_map(|n| numbered.iter().find(|(idx, _)| idx == n).map(|(_, tool)| *tool))
        .collect()
}
