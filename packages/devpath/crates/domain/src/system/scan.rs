//! Filesystem primitives the locator is built from.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use walkdir::WalkDir;

use crate::entities::tool::names_match;
use crate::system::expand::expand_env_refs;

/// Directory names never descended into during a whole-volume search.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "Temp",
    "tmp",
    "cache",
    "$Recycle.Bin",
    "System Volume Information",
];

/// A non-fatal problem met while searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIssue {
    pub path: PathBuf,
    pub message: String,
}

impl SearchIssue {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SearchIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub matches: Vec<PathBuf>,
    pub issues: Vec<SearchIssue>,
}

/// Turns one catalog pattern into the existing directories it names.
/// Missing directories yield nothing.
pub fn expand_candidate(pattern: &str, lookup: impl Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    let expanded = expand_env_refs(pattern, lookup);

    if !expanded.contains(['*', '?']) {
        let path = PathBuf::from(expanded);
        return if path.is_dir() { vec![path] } else { Vec::new() };
    }

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    match glob::glob_with(&expanded, options) {
        Ok(paths) => {
            let mut dirs: Vec<PathBuf> = paths.flatten().filter(|p| p.is_dir()).collect();
            dirs.sort();
            dirs
        }
        Err(err) => {
            tracing::debug!("Ignoring invalid candidate pattern {}: {}", pattern, err);
            Vec::new()
        }
    }
}

/// Recursively walks `root` collecting files named `executable`.
pub fn scan_for_executable(root: &Path, executable: &str, skip_dirs: &[String]) -> ScanOutcome {
    let mut matches = Vec::new();
    let issues = scan_streaming(root, executable, skip_dirs, |path| matches.push(path));
    ScanOutcome { matches, issues }
}

/// Like [`scan_for_executable`] but hands every match to `on_match` as soon
/// as it is found. Returns the issues met along the way.
///
/// Permission-denied entries are skipped silently; any other walk error is
/// recorded and the walk carries on.
pub fn scan_streaming(
    root: &Path,
    executable: &str,
    skip_dirs: &[String],
    mut on_match: impl FnMut(PathBuf),
) -> Vec<SearchIssue> {
    let mut issues = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !skip_dirs.iter().any(|skip| names_match(skip, &name))
        });

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file()
                    && names_match(&entry.file_name().to_string_lossy(), executable)
                {
                    on_match(entry.into_path());
                }
            }
            Err(err) => {
                if err.io_error().map(|e| e.kind()) == Some(ErrorKind::PermissionDenied) {
                    continue;
                }
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                issues.push(SearchIssue::new(path, err.to_string()));
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_nested_matches_case_insensitively() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a/bin/Tool.EXE"));
        touch(&dir.path().join("b/deep/er/tool.exe"));
        touch(&dir.path().join("b/other.exe"));

        let outcome = scan_for_executable(dir.path(), "tool.exe", &[]);
        assert_eq!(outcome.matches.len(), 2);
        assert!(outcome.issues.is_empty());
        assert!(outcome.matches[0].ends_with("a/bin/Tool.EXE"));
    }

    #[test]
    fn skip_list_prunes_directories() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("cache/tool.exe"));
        touch(&dir.path().join("TEMP/tool.exe"));
        touch(&dir.path().join("keep/tool.exe"));

        let skip: Vec<String> = DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect();
        let outcome = scan_for_executable(dir.path(), "tool.exe", &skip);
        assert_eq!(outcome.matches, vec![dir.path().join("keep/tool.exe")]);
    }

    #[test]
    fn candidate_expansion_keeps_existing_directories_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Python311")).unwrap();
        fs::create_dir_all(dir.path().join("Python312")).unwrap();
        touch(&dir.path().join("Python3.txt"));

        let root = dir.path().to_string_lossy().to_string();
        let lookup = |name: &str| (name == "ROOT").then(|| root.clone());

        let found = expand_candidate("%ROOT%/python3*", lookup);
        assert_eq!(
            found,
            vec![dir.path().join("Python311"), dir.path().join("Python312")]
        );

        assert!(expand_candidate("%ROOT%/missing", lookup).is_empty());
        assert_eq!(expand_candidate("%ROOT%", lookup), vec![dir.path().to_path_buf()]);
    }
}
