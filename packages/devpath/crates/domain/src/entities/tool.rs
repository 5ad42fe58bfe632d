use serde::{Deserialize, Serialize};

/// A development tool the locator knows how to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Display name, also the key profiles are matched against.
    pub name: String,
    /// File name to look for, compared case-insensitively.
    pub executable: String,
    /// Install locations to try first. May hold `%VAR%` references and
    /// `*`/`?` wildcard segments.
    #[serde(default)]
    pub candidate_paths: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "Other".to_string()
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            candidate_paths: Vec::new(),
            category: default_category(),
        }
    }

    pub fn with_candidates<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// True when `file_name` is this tool's executable.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        names_match(file_name, &self.executable)
    }
}

/// Case-insensitive comparison used for file and tool names.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
