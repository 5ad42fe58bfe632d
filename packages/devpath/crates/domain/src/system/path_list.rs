//! Rules for `;`-delimited PATH values.

use std::collections::HashSet;
use std::path::PathBuf;

pub const PATH_SEPARATOR: char = ';';

/// Comparison key for a path: forward slashes, no trailing slash, lowercase.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let trimmed = unified.trim_end_matches('/');
    if trimmed.is_empty() && !unified.is_empty() {
        return "/".to_string();
    }
    trimmed.to_lowercase()
}

/// Non-empty entries of a PATH value, in order.
pub fn split_entries(raw: &str) -> Vec<&str> {
    raw.split(PATH_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

pub fn contains_entry(raw: &str, candidate: &str) -> bool {
    let wanted = normalize_path(candidate);
    split_entries(raw)
        .into_iter()
        .any(|entry| normalize_path(entry) == wanted)
}

/// Appends `entry` keeping exactly one separator between the old value and
/// the new entry.
pub fn append_entry(raw: &str, entry: &str) -> String {
    let base = raw.trim_end_matches(PATH_SEPARATOR);
    if base.trim().is_empty() {
        return entry.to_string();
    }
    format!("{}{}{}", base, PATH_SEPARATOR, entry)
}

/// Drops every entry whose normalized form matches one of `entries`, and
/// collapses later duplicates of the entries that remain when
/// `collapse_duplicates` is set. Returns the new value and the number of
/// entries removed.
pub fn remove_entries(raw: &str, entries: &[String], collapse_duplicates: bool) -> (String, usize) {
    let doomed: HashSet<String> = entries.iter().map(|e| normalize_path(e)).collect();
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut removed = 0;

    for entry in split_entries(raw) {
        let key = normalize_path(entry);
        if doomed.contains(&key) || (collapse_duplicates && !seen.insert(key)) {
            removed += 1;
            continue;
        }
        kept.push(entry);
    }

    (kept.join(&PATH_SEPARATOR.to_string()), removed)
}

/// Insertion-ordered set of filesystem paths compared by normalized form.
#[derive(Debug, Default, Clone)]
pub struct PathSet {
    seen: HashSet<String>,
    paths: Vec<PathBuf>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equivalent path was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        let key = normalize_path(&path.to_string_lossy());
        if !self.seen.insert(key) {
            return false;
        }
        self.paths.push(path);
        true
    }

    pub fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) -> usize {
        paths.into_iter().filter(|p| self.insert(p.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_case_separators_and_trailing_slash() {
        assert_eq!(normalize_path(r"C:\B\"), "c:/b");
        assert_eq!(normalize_path("c:/b"), "c:/b");
        assert_eq!(normalize_path(r"C:\Program Files\Go\bin\\"), "c:/program files/go/bin");
    }

    #[test]
    fn contains_matches_normalized_entries() {
        let raw = r"C:\A;C:\B\";
        assert!(contains_entry(raw, r"C:\b"));
        assert!(contains_entry(raw, "c:/a/"));
        assert!(!contains_entry(raw, r"C:\C"));
    }

    #[test]
    fn append_keeps_a_single_separator() {
        assert_eq!(append_entry(r"C:\A", r"C:\B"), r"C:\A;C:\B");
        assert_eq!(append_entry(r"C:\A;", r"C:\B"), r"C:\A;C:\B");
        assert_eq!(append_entry(r"C:\A;;", r"C:\B"), r"C:\A;C:\B");
        assert_eq!(append_entry("", r"C:\B"), r"C:\B");
    }

    #[test]
    fn split_skips_empty_segments() {
        assert_eq!(split_entries(r"C:\A;;C:\B;"), vec![r"C:\A", r"C:\B"]);
    }

    #[test]
    fn remove_drops_named_entries_and_duplicates() {
        let raw = r"C:\A;C:\Gone;C:\B;c:\a\";
        let (value, removed) = remove_entries(raw, &[r"c:\gone".to_string()], true);
        assert_eq!(value, r"C:\A;C:\B");
        assert_eq!(removed, 2);

        let (value, removed) = remove_entries(raw, &[], false);
        assert_eq!(value, r"C:\A;C:\Gone;C:\B;c:\a\");
        assert_eq!(removed, 0);
    }

    #[test]
    fn path_set_dedupes_case_insensitively() {
        let mut set = PathSet::new();
        assert!(set.insert(PathBuf::from(r"C:\Go\bin\go.exe")));
        assert!(!set.insert(PathBuf::from(r"c:\go\BIN\GO.EXE")));
        assert_eq!(set.extend(vec![PathBuf::from("/x"), PathBuf::from("/X")]), 1);
        assert_eq!(set.len(), 2);
    }
}
